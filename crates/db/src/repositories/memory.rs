use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use stockflow_core::chain::ChainLevel;
use stockflow_core::delegation::DelegationGrant;
use stockflow_core::domain::actor::Actor;
use stockflow_core::domain::document::{DocumentId, DocumentType};
use stockflow_core::domain::rule::WorkflowRule;
use stockflow_core::domain::step::{ApprovalStep, StepId, StepStatus};
use stockflow_core::steps::{actionable_step, transition};

use super::{
    ActorRepository, ApprovalStepRepository, DelegationRepository, RepositoryError,
    WorkflowRuleRepository,
};

#[derive(Default)]
pub struct InMemoryWorkflowRuleRepository {
    rules: RwLock<Vec<WorkflowRule>>,
}

impl InMemoryWorkflowRuleRepository {
    pub fn with_rules(rules: Vec<WorkflowRule>) -> Self {
        Self { rules: RwLock::new(rules) }
    }
}

#[async_trait]
impl WorkflowRuleRepository for InMemoryWorkflowRuleRepository {
    async fn rules_for(
        &self,
        document_type: DocumentType,
    ) -> Result<Vec<WorkflowRule>, RepositoryError> {
        let rules = self.rules.read().await;
        Ok(rules.iter().filter(|rule| rule.document_type == document_type).cloned().collect())
    }
}

/// Mirrors the SQL repository's conflict semantics: a decision against a step
/// that is no longer pending is reported, never silently absorbed.
#[derive(Default)]
pub struct InMemoryApprovalStepRepository {
    steps: RwLock<Vec<ApprovalStep>>,
}

impl InMemoryApprovalStepRepository {
    pub async fn snapshot(&self) -> Vec<ApprovalStep> {
        self.steps.read().await.clone()
    }
}

#[async_trait]
impl ApprovalStepRepository for InMemoryApprovalStepRepository {
    async fn create_levels(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        levels: &[ChainLevel],
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut steps = self.steps.write().await;
        for level in levels {
            let exists = steps.iter().any(|step| {
                step.document_type == document_type
                    && step.document_id == *document_id
                    && step.level == level.position
            });
            if exists {
                continue;
            }
            steps.push(ApprovalStep {
                id: StepId(Uuid::new_v4().to_string()),
                document_type,
                document_id: document_id.clone(),
                level: level.position,
                approver_role: level.approver_role.clone(),
                status: StepStatus::Pending,
                approver_id: None,
                notes: None,
                decided_at: None,
                created_at,
            });
        }
        Ok(())
    }

    async fn find_actionable(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Option<ApprovalStep>, RepositoryError> {
        let steps = self.steps.read().await;
        let document_steps: Vec<ApprovalStep> = steps
            .iter()
            .filter(|step| {
                step.document_type == document_type && step.document_id == *document_id
            })
            .cloned()
            .collect();
        Ok(actionable_step(&document_steps).cloned())
    }

    async fn steps_for_document(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Vec<ApprovalStep>, RepositoryError> {
        let steps = self.steps.read().await;
        let mut document_steps: Vec<ApprovalStep> = steps
            .iter()
            .filter(|step| {
                step.document_type == document_type && step.document_id == *document_id
            })
            .cloned()
            .collect();
        document_steps.sort_by_key(|step| step.level);
        Ok(document_steps)
    }

    async fn pending_steps(&self) -> Result<Vec<ApprovalStep>, RepositoryError> {
        let steps = self.steps.read().await;
        let mut pending: Vec<ApprovalStep> =
            steps.iter().filter(|step| step.status == StepStatus::Pending).cloned().collect();
        pending.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.document_id.0.cmp(&right.document_id.0))
        });
        Ok(pending)
    }

    async fn approve(
        &self,
        step_id: &StepId,
        approver_id: &str,
        notes: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut steps = self.steps.write().await;
        let step = steps
            .iter_mut()
            .find(|step| step.id == *step_id)
            .ok_or(RepositoryError::Conflict)?;

        let status =
            transition(step, StepStatus::Approved).map_err(|_| RepositoryError::Conflict)?;
        step.status = status;
        step.approver_id = Some(approver_id.to_string());
        step.notes = notes.map(str::to_string);
        step.decided_at = Some(decided_at);
        Ok(())
    }

    async fn reject(
        &self,
        target: &ApprovalStep,
        approver_id: &str,
        notes: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut steps = self.steps.write().await;
        let step = steps
            .iter_mut()
            .find(|step| step.id == target.id)
            .ok_or(RepositoryError::Conflict)?;

        let status =
            transition(step, StepStatus::Rejected).map_err(|_| RepositoryError::Conflict)?;
        step.status = status;
        step.approver_id = Some(approver_id.to_string());
        step.notes = notes.map(str::to_string);
        step.decided_at = Some(decided_at);

        let mut skipped = 0;
        for sibling in steps.iter_mut().filter(|step| {
            step.document_type == target.document_type
                && step.document_id == target.document_id
                && step.level > target.level
                && step.status == StepStatus::Pending
        }) {
            sibling.status = StepStatus::Skipped;
            sibling.decided_at = Some(decided_at);
            skipped += 1;
        }
        Ok(skipped)
    }
}

#[derive(Default)]
pub struct InMemoryDelegationRepository {
    grants: RwLock<Vec<DelegationGrant>>,
}

impl InMemoryDelegationRepository {
    pub fn with_grants(grants: Vec<DelegationGrant>) -> Self {
        Self { grants: RwLock::new(grants) }
    }

    pub async fn set_grants(&self, grants: Vec<DelegationGrant>) {
        *self.grants.write().await = grants;
    }
}

#[async_trait]
impl DelegationRepository for InMemoryDelegationRepository {
    async fn active_grants_for(
        &self,
        delegate_id: &str,
        as_of_day: NaiveDate,
    ) -> Result<Vec<DelegationGrant>, RepositoryError> {
        let grants = self.grants.read().await;
        Ok(grants
            .iter()
            .filter(|grant| {
                grant.rule.delegate_id == delegate_id
                    && grant.rule.is_active
                    && grant.rule.starts_on <= as_of_day
                    && as_of_day <= grant.rule.ends_on
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryActorRepository {
    actors: RwLock<Vec<Actor>>,
}

impl InMemoryActorRepository {
    pub fn with_actors(actors: Vec<Actor>) -> Self {
        Self { actors: RwLock::new(actors) }
    }
}

#[async_trait]
impl ActorRepository for InMemoryActorRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Actor>, RepositoryError> {
        let actors = self.actors.read().await;
        Ok(actors.iter().find(|actor| actor.id == id).cloned())
    }
}
