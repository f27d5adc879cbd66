use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::warn;

use stockflow_core::audit::{AuditAction, AuditRecord, AuditSink};
use stockflow_core::chain::{resolve, sla_hours_for_role, ChainLevel};
use stockflow_core::delegation::authorize;
use stockflow_core::domain::document::{DocumentId, DocumentStatus, DocumentType};
use stockflow_core::domain::step::ApprovalStep;
use stockflow_core::errors::ApprovalError;
use stockflow_core::events::{DomainEvent, EventBus};
use stockflow_core::notify::Notifier;
use stockflow_core::sla::{due_date, Clock};

use stockflow_db::documents::{DocumentStore, DocumentStoreRegistry};
use stockflow_db::repositories::{
    ActorRepository, ApprovalStepRepository, DelegationRepository, RepositoryError,
    WorkflowRuleRepository,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecisionAction {
    Approve,
    Reject,
}

/// Level-1 details returned from a successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub level: ChainLevel,
    pub due_date: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The chain advanced to a further level. `due_date` is None when the
    /// workflow configuration no longer names the next role's SLA.
    Advanced { next: ApprovalStep, due_date: Option<DateTime<Utc>> },
    /// The last level approved; the document is now approved.
    Completed,
    Rejected { skipped: u64 },
}

/// Public entry point of the approval engine. Stateless between calls: all
/// chain state lives in the persistent store, and each submit/decide runs to
/// completion within a single request.
pub struct ApprovalOrchestrator {
    rules: Arc<dyn WorkflowRuleRepository>,
    steps: Arc<dyn ApprovalStepRepository>,
    delegations: Arc<dyn DelegationRepository>,
    actors: Arc<dyn ActorRepository>,
    documents: DocumentStoreRegistry,
    audit: Arc<dyn AuditSink>,
    notifier: Arc<dyn Notifier>,
    events: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl ApprovalOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        rules: Arc<dyn WorkflowRuleRepository>,
        steps: Arc<dyn ApprovalStepRepository>,
        delegations: Arc<dyn DelegationRepository>,
        actors: Arc<dyn ActorRepository>,
        documents: DocumentStoreRegistry,
        audit: Arc<dyn AuditSink>,
        notifier: Arc<dyn Notifier>,
        events: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { rules, steps, delegations, actors, documents, audit, notifier, events, clock }
    }

    /// Resolve the required chain for the document and create its pending
    /// steps. Idempotent: re-submission never duplicates levels. All
    /// validation happens before any write.
    pub async fn submit(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        amount: Decimal,
        submitted_by: &str,
    ) -> Result<SubmitReceipt, ApprovalError> {
        let rules = self.rules.rules_for(document_type).await.map_err(persistence)?;
        let levels = resolve(&rules, document_type, amount);
        if levels.is_empty() {
            return Err(ApprovalError::NoWorkflowConfigured { document_type });
        }

        let store = self.store_for(document_type)?;
        let snapshot = store
            .find(document_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApprovalError::NotFound {
                entity: "document",
                id: document_id.0.clone(),
            })?;

        let now = self.clock.now();
        self.steps
            .create_levels(document_type, document_id, &levels, now)
            .await
            .map_err(persistence)?;

        let first = levels[0].clone();
        let due = due_date(first.sla_hours, now);
        store.mark_pending_approval(document_id, due).await.map_err(persistence)?;

        let payload = json!({
            "document_type": document_type.as_str(),
            "document_id": document_id.0.clone(),
            "level": first.position,
            "approver_role": first.approver_role.clone(),
            "sla_due_date": due.to_rfc3339(),
            "amount": amount.to_string(),
        });
        self.emit_audit(
            AuditRecord::new(
                document_type.as_str(),
                document_id.0.clone(),
                AuditAction::SubmitForApproval,
                json!({
                    "status": DocumentStatus::PendingApproval.as_str(),
                    "sla_due_date": due.to_rfc3339(),
                    "chain": levels,
                }),
                submitted_by,
                now,
            )
            .with_old_values(json!({ "status": snapshot.status.as_str() })),
        )
        .await;
        self.emit_role_notification(&first.approver_role, "approval:requested", payload.clone())
            .await;
        self.emit_event(DomainEvent::new(
            "approval:requested",
            document_type.as_str(),
            document_id.0.clone(),
            "update",
            payload,
            submitted_by,
            now,
        ))
        .await;

        Ok(SubmitReceipt { level: first, due_date: due })
    }

    /// Apply an approve/reject decision to the document's actionable step.
    /// Authorization and step lookup happen before any mutation; a guarded
    /// transition losing a race surfaces as `Conflict`.
    pub async fn decide(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        action: DecisionAction,
        actor_id: &str,
        notes: Option<&str>,
    ) -> Result<DecisionOutcome, ApprovalError> {
        let step = self
            .steps
            .find_actionable(document_type, document_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApprovalError::NoActionableStep {
                document_type,
                document_id: document_id.0.clone(),
            })?;

        let now = self.clock.now();
        let today = now.date_naive();
        let actor = self.actors.find_by_id(actor_id).await.map_err(persistence)?;
        let grants =
            self.delegations.active_grants_for(actor_id, today).await.map_err(persistence)?;
        if authorize(actor.as_ref(), &step.approver_role, document_type, &grants, today).is_none()
        {
            return Err(ApprovalError::Unauthorized {
                actor_id: actor_id.to_string(),
                required_role: step.approver_role.clone(),
            });
        }

        self.apply_decision(step, action, actor_id, notes, now).await
    }

    /// The mutation half of `decide`, split out so the contested transition
    /// can be exercised against a stale step.
    async fn apply_decision(
        &self,
        step: ApprovalStep,
        action: DecisionAction,
        actor_id: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, ApprovalError> {
        let document_type = step.document_type;
        let document_id = step.document_id.clone();
        let store = self.store_for(document_type)?;

        match action {
            DecisionAction::Reject => {
                let skipped = self
                    .steps
                    .reject(&step, actor_id, notes, now)
                    .await
                    .map_err(|error| conflict_or_persistence(error, &step))?;
                store.mark_rejected(&document_id, notes).await.map_err(persistence)?;

                let payload = json!({
                    "document_type": document_type.as_str(),
                    "document_id": document_id.0.clone(),
                    "level": step.level,
                    "rejected_by": actor_id,
                    "reason": notes,
                    "skipped_levels": skipped,
                });
                self.emit_audit(
                    AuditRecord::new(
                        document_type.as_str(),
                        document_id.0.clone(),
                        AuditAction::Reject,
                        json!({
                            "status": DocumentStatus::Rejected.as_str(),
                            "rejection_reason": notes,
                            "level": step.level,
                        }),
                        actor_id,
                        now,
                    )
                    .with_old_values(
                        json!({ "status": DocumentStatus::PendingApproval.as_str() }),
                    ),
                )
                .await;
                self.emit_watcher_notification(
                    document_type,
                    &document_id,
                    "approval:rejected",
                    payload.clone(),
                )
                .await;
                self.emit_event(DomainEvent::new(
                    "approval:rejected",
                    document_type.as_str(),
                    document_id.0.clone(),
                    "update",
                    payload,
                    actor_id,
                    now,
                ))
                .await;

                Ok(DecisionOutcome::Rejected { skipped })
            }
            DecisionAction::Approve => {
                self.steps
                    .approve(&step.id, actor_id, notes, now)
                    .await
                    .map_err(|error| conflict_or_persistence(error, &step))?;

                let next = self
                    .steps
                    .find_actionable(document_type, &document_id)
                    .await
                    .map_err(persistence)?;

                match next {
                    Some(next) => {
                        let rules =
                            self.rules.rules_for(document_type).await.map_err(persistence)?;
                        let due = match sla_hours_for_role(
                            &rules,
                            document_type,
                            &next.approver_role,
                        ) {
                            Some(sla_hours) => {
                                let due = due_date(sla_hours, now);
                                store
                                    .set_sla_due_date(&document_id, due)
                                    .await
                                    .map_err(persistence)?;
                                Some(due)
                            }
                            None => {
                                warn!(
                                    document_type = document_type.as_str(),
                                    document_id = %document_id.0,
                                    approver_role = %next.approver_role,
                                    "no workflow rule names the next role; keeping prior due date"
                                );
                                None
                            }
                        };

                        let payload = json!({
                            "document_type": document_type.as_str(),
                            "document_id": document_id.0.clone(),
                            "level": next.level,
                            "approver_role": next.approver_role.clone(),
                            "previously_approved_by": actor_id,
                            "sla_due_date": due.map(|value| value.to_rfc3339()),
                        });
                        self.emit_audit(
                            AuditRecord::new(
                                document_type.as_str(),
                                document_id.0.clone(),
                                AuditAction::ApproveLevel,
                                json!({
                                    "approved_level": step.level,
                                    "next_level": next.level,
                                    "sla_due_date": due.map(|value| value.to_rfc3339()),
                                }),
                                actor_id,
                                now,
                            ),
                        )
                        .await;
                        self.emit_role_notification(
                            &next.approver_role,
                            "approval:requested",
                            payload.clone(),
                        )
                        .await;
                        self.emit_event(DomainEvent::new(
                            "approval:level_approved",
                            document_type.as_str(),
                            document_id.0.clone(),
                            "update",
                            payload,
                            actor_id,
                            now,
                        ))
                        .await;

                        Ok(DecisionOutcome::Advanced { next, due_date: due })
                    }
                    None => {
                        store
                            .mark_approved(&document_id, actor_id, now)
                            .await
                            .map_err(persistence)?;

                        let payload = json!({
                            "document_type": document_type.as_str(),
                            "document_id": document_id.0.clone(),
                            "approved_by": actor_id,
                            "approved_at": now.to_rfc3339(),
                        });
                        self.emit_audit(
                            AuditRecord::new(
                                document_type.as_str(),
                                document_id.0.clone(),
                                AuditAction::Finalize,
                                json!({
                                    "status": DocumentStatus::Approved.as_str(),
                                    "approved_by": actor_id,
                                }),
                                actor_id,
                                now,
                            )
                            .with_old_values(
                                json!({ "status": DocumentStatus::PendingApproval.as_str() }),
                            ),
                        )
                        .await;
                        self.emit_watcher_notification(
                            document_type,
                            &document_id,
                            "approval:approved",
                            payload.clone(),
                        )
                        .await;
                        self.emit_event(DomainEvent::new(
                            "approval:approved",
                            document_type.as_str(),
                            document_id.0.clone(),
                            "update",
                            payload,
                            actor_id,
                            now,
                        ))
                        .await;

                        Ok(DecisionOutcome::Completed)
                    }
                }
            }
        }
    }

    /// Ordered approval record for one document.
    pub async fn get_steps(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
    ) -> Result<Vec<ApprovalStep>, ApprovalError> {
        self.steps.steps_for_document(document_type, document_id).await.map_err(persistence)
    }

    /// Actionable steps this actor may act on. Admins pass authorization for
    /// every role, so they see every document's actionable step; everyone
    /// else sees the steps reachable directly or through an active
    /// delegation.
    pub async fn get_pending_for_actor(
        &self,
        actor_id: &str,
    ) -> Result<Vec<ApprovalStep>, ApprovalError> {
        let actor = self
            .actors
            .find_by_id(actor_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| ApprovalError::NotFound { entity: "actor", id: actor_id.to_string() })?;

        let today = self.clock.now().date_naive();
        let grants =
            self.delegations.active_grants_for(actor_id, today).await.map_err(persistence)?;
        let pending = self.steps.pending_steps().await.map_err(persistence)?;

        Ok(pending
            .into_iter()
            .filter(|step| {
                authorize(Some(&actor), &step.approver_role, step.document_type, &grants, today)
                    .is_some()
            })
            .collect())
    }

    fn store_for(&self, document_type: DocumentType) -> Result<&dyn DocumentStore, ApprovalError> {
        self.documents.store_for(document_type).ok_or_else(|| {
            ApprovalError::Persistence(format!(
                "no document store registered for `{document_type}`"
            ))
        })
    }

    async fn emit_audit(&self, record: AuditRecord) {
        if let Err(error) = self.audit.record(record).await {
            warn!(%error, "audit emission failed after committed transition");
        }
    }

    async fn emit_role_notification(&self, role: &str, event_name: &str, payload: serde_json::Value) {
        if let Err(error) = self.notifier.notify_role(role, event_name, payload).await {
            warn!(%error, role, event_name, "role notification failed after committed transition");
        }
    }

    async fn emit_watcher_notification(
        &self,
        document_type: DocumentType,
        document_id: &DocumentId,
        event_name: &str,
        payload: serde_json::Value,
    ) {
        if let Err(error) = self
            .notifier
            .notify_document_watchers(document_type, document_id, event_name, payload)
            .await
        {
            warn!(
                %error,
                document_id = %document_id.0,
                event_name,
                "watcher notification failed after committed transition"
            );
        }
    }

    async fn emit_event(&self, event: DomainEvent) {
        let event_type = event.event_type.clone();
        if let Err(error) = self.events.publish(event).await {
            warn!(%error, event_type, "event publication failed after committed transition");
        }
    }
}

fn persistence(error: RepositoryError) -> ApprovalError {
    ApprovalError::Persistence(error.to_string())
}

fn conflict_or_persistence(error: RepositoryError, step: &ApprovalStep) -> ApprovalError {
    match error {
        RepositoryError::Conflict => ApprovalError::Conflict {
            document_type: step.document_type,
            document_id: step.document_id.0.clone(),
            level: step.level,
        },
        other => persistence(other),
    }
}
