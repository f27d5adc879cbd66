use serde::{Deserialize, Serialize};

/// The `admin` role is authorized for every required role unconditionally.
pub const ADMIN_ROLE: &str = "admin";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: String,
    pub is_active: bool,
}
