use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of business documents that flow through the approval engine.
/// Persistence targets and notification payloads key off the snake_case form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    MaterialIssue,
    JobOrder,
    PurchaseRequest,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] =
        [Self::MaterialIssue, Self::JobOrder, Self::PurchaseRequest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaterialIssue => "material_issue",
            Self::JobOrder => "job_order",
            Self::PurchaseRequest => "purchase_request",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "material_issue" => Some(Self::MaterialIssue),
            "job_order" => Some(Self::JobOrder),
            "purchase_request" => Some(Self::PurchaseRequest),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    PendingApproval,
    Approved,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// The slice of a document the engine is allowed to see and update. The rest
/// of each document belongs to its own feature module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub status: DocumentStatus,
    pub sla_due_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::{DocumentStatus, DocumentType};

    #[test]
    fn document_type_round_trips_through_str_form() {
        for document_type in DocumentType::ALL {
            assert_eq!(DocumentType::parse(document_type.as_str()), Some(document_type));
        }
        assert_eq!(DocumentType::parse("gate_pass"), None);
    }

    #[test]
    fn document_status_round_trips_through_str_form() {
        for status in [
            DocumentStatus::Draft,
            DocumentStatus::PendingApproval,
            DocumentStatus::Approved,
            DocumentStatus::Rejected,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
    }
}
