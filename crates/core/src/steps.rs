use thiserror::Error;

use crate::domain::step::{ApprovalStep, StepStatus};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StepTransitionError {
    #[error("step at level {level} is already {status:?} and cannot change")]
    AlreadyDecided { level: u32, status: StepStatus },
    #[error("a step cannot transition back to pending")]
    RevertToPending,
}

/// Legal per-step transitions: pending may move to exactly one terminal
/// state; terminal states never change again.
pub fn transition(
    current: &ApprovalStep,
    target: StepStatus,
) -> Result<StepStatus, StepTransitionError> {
    if current.status.is_terminal() {
        return Err(StepTransitionError::AlreadyDecided {
            level: current.level,
            status: current.status,
        });
    }
    if target == StepStatus::Pending {
        return Err(StepTransitionError::RevertToPending);
    }
    Ok(target)
}

/// The single step a document is currently waiting on: the pending step with
/// the minimum level. None when nothing is pending (never submitted, or the
/// chain is fully resolved).
pub fn actionable_step(steps: &[ApprovalStep]) -> Option<&ApprovalStep> {
    steps
        .iter()
        .filter(|step| step.status == StepStatus::Pending)
        .min_by_key(|step| step.level)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{actionable_step, transition, StepTransitionError};
    use crate::domain::document::{DocumentId, DocumentType};
    use crate::domain::step::{ApprovalStep, StepId, StepStatus};

    fn step(level: u32, status: StepStatus) -> ApprovalStep {
        ApprovalStep {
            id: StepId(format!("step-{level}")),
            document_type: DocumentType::MaterialIssue,
            document_id: DocumentId("MI-001".to_string()),
            level,
            approver_role: "supervisor".to_string(),
            status,
            approver_id: None,
            notes: None,
            decided_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn pending_moves_to_each_terminal_state() {
        let pending = step(1, StepStatus::Pending);
        for target in [StepStatus::Approved, StepStatus::Rejected, StepStatus::Skipped] {
            assert_eq!(transition(&pending, target), Ok(target));
        }
    }

    #[test]
    fn terminal_states_never_change() {
        for status in [StepStatus::Approved, StepStatus::Rejected, StepStatus::Skipped] {
            let decided = step(2, status);
            assert_eq!(
                transition(&decided, StepStatus::Approved),
                Err(StepTransitionError::AlreadyDecided { level: 2, status })
            );
        }
    }

    #[test]
    fn pending_cannot_be_reasserted() {
        let pending = step(1, StepStatus::Pending);
        assert_eq!(
            transition(&pending, StepStatus::Pending),
            Err(StepTransitionError::RevertToPending)
        );
    }

    #[test]
    fn actionable_step_is_the_lowest_pending_level() {
        let steps = vec![
            step(2, StepStatus::Pending),
            step(1, StepStatus::Approved),
            step(3, StepStatus::Pending),
        ];

        let actionable = actionable_step(&steps).expect("pending step");
        assert_eq!(actionable.level, 2);
    }

    #[test]
    fn fully_resolved_chain_has_no_actionable_step() {
        let steps = vec![
            step(1, StepStatus::Approved),
            step(2, StepStatus::Rejected),
            step(3, StepStatus::Skipped),
        ];
        assert!(actionable_step(&steps).is_none());
        assert!(actionable_step(&[]).is_none());
    }
}
