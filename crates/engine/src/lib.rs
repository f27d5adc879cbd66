pub mod bootstrap;
pub mod orchestrator;

pub use bootstrap::{
    bootstrap, bootstrap_with_config, init_logging, BootstrapError, Collaborators, Engine,
};
pub use orchestrator::{ApprovalOrchestrator, DecisionAction, DecisionOutcome, SubmitReceipt};
