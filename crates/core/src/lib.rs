pub mod audit;
pub mod chain;
pub mod config;
pub mod delegation;
pub mod domain;
pub mod errors;
pub mod events;
pub mod notify;
pub mod sla;
pub mod steps;

pub use audit::{AuditAction, AuditRecord, AuditSink, InMemoryAuditSink};
pub use chain::{resolve, sla_hours_for_role, ChainLevel};
pub use delegation::{authorize, Authorization, DelegationGrant};
pub use domain::actor::{Actor, ADMIN_ROLE};
pub use domain::document::{DocumentId, DocumentSnapshot, DocumentStatus, DocumentType};
pub use domain::rule::{DelegationRule, DelegationScope, WorkflowRule};
pub use domain::step::{ApprovalStep, StepId, StepStatus};
pub use errors::{ApprovalError, SideEffectError};
pub use events::{DomainEvent, EventBus, InMemoryEventBus};
pub use notify::{InMemoryNotifier, Notifier};
pub use sla::{due_date, Clock, FixedClock, SystemClock};
pub use steps::{actionable_step, transition, StepTransitionError};
