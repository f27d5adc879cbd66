use thiserror::Error;

use crate::domain::document::DocumentType;

/// Failures the orchestrator reports to callers. The first four variants are
/// validated before any write, so a failed submit/decide leaves no partial
/// chain state.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("no approval workflow configured for `{document_type}`")]
    NoWorkflowConfigured { document_type: DocumentType },
    #[error("no actionable approval step for {document_type} `{document_id}`")]
    NoActionableStep { document_type: DocumentType, document_id: String },
    #[error("actor `{actor_id}` is not authorized to act as `{required_role}`")]
    Unauthorized { actor_id: String, required_role: String },
    #[error("level {level} of {document_type} `{document_id}` is no longer pending")]
    Conflict { document_type: DocumentType, document_id: String, level: u32 },
    #[error("unknown {entity} `{id}`")]
    NotFound { entity: &'static str, id: String },
    #[error("persistence failure: {0}")]
    Persistence(String),
}

/// Failure of a post-commit emission (audit, notification, event). Logged and
/// swallowed relative to the already-committed decision.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("side effect delivery failed: {0}")]
pub struct SideEffectError(pub String);
