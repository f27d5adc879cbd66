pub mod actor;
pub mod document;
pub mod rule;
pub mod step;
