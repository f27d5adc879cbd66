use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use stockflow_core::chain::ChainLevel;
use stockflow_core::delegation::DelegationGrant;
use stockflow_core::domain::actor::Actor;
use stockflow_core::domain::document::{DocumentId, DocumentType};
use stockflow_core::domain::rule::WorkflowRule;
use stockflow_core::domain::step::{ApprovalStep, StepId};

pub mod actor;
pub mod delegation;
pub mod memory;
pub mod step;
pub mod workflow_rule;

pub use actor::SqlActorRepository;
pub use delegation::SqlDelegationRepository;
pub use memory::{
    InMemoryActorRepository, InMemoryApprovalStepRepository, InMemoryDelegationRepository,
    InMemoryWorkflowRuleRepository,
};
pub use step::SqlApprovalStepRepository;
pub use workflow_rule::SqlWorkflowRuleRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    /// The guarded transition found its target no longer pending. Surfaced
    /// as a distinct outcome so callers can refetch instead of retrying
    /// blindly.
    #[error("conditional update matched no pending row")]
    Conflict,
}

#[async_trait]
pub trait WorkflowRuleRepository: Send + Sync {
    async fn rules_for(
        &self,
        document_type: DocumentType,
    ) -> Result<Vec<WorkflowRule>, RepositoryError>;
}

#[async_trait]
pub trait ApprovalStepRepository: Send + Sync {
    /// Insert a pending step for every level not already present under the
    /// (document_type, document_id, level) unique key. Levels that exist are
    /// left untouched; safe under concurrent re-submission.
    async fn create_levels(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        levels: &[ChainLevel],
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    async fn find_actionable(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Option<ApprovalStep>, RepositoryError>;

    async fn steps_for_document(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Vec<ApprovalStep>, RepositoryError>;

    /// Every document's actionable step, across all documents.
    async fn pending_steps(&self) -> Result<Vec<ApprovalStep>, RepositoryError>;

    /// Guarded transition to approved: `WHERE id = ? AND status = 'pending'`
    /// inside a transaction. Zero rows affected means another decision won
    /// the race; reported as `RepositoryError::Conflict`.
    async fn approve(
        &self,
        step_id: &StepId,
        approver_id: &str,
        notes: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Guarded transition to rejected, plus a bulk pending->skipped update
    /// for every higher level of the same document, in one transaction.
    /// Returns the number of skipped steps.
    async fn reject(
        &self,
        step: &ApprovalStep,
        approver_id: &str,
        notes: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait DelegationRepository: Send + Sync {
    /// Active delegation rows naming this delegate, each joined with its
    /// delegator. The query prefilters by calendar day; the authorizer
    /// remains the source of truth for window, scope, and role checks.
    async fn active_grants_for(
        &self,
        delegate_id: &str,
        as_of_day: NaiveDate,
    ) -> Result<Vec<DelegationGrant>, RepositoryError>;
}

#[async_trait]
pub trait ActorRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Actor>, RepositoryError>;
}
