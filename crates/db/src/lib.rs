pub mod connection;
pub mod documents;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_settings, DbPool};
pub use documents::{DocumentStoreRegistry, InMemoryDocumentStore, SqlDocumentStore};
pub use fixtures::{seed_reference_data, verify_seed, SeedSummary};
