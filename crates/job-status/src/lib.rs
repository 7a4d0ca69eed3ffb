//! Job status values and the lifecycle state machine.
//!
//! The machine is a static adjacency table. Asking whether an edge is
//! legal is a pure lookup, so any number of monitor threads can share it
//! without coordination.

mod machine;
mod status;

pub use machine::{can_transition, can_transition_named, legal_targets, Fired, StatusMachine, Strictness};
pub use status::JobStatus;

/// Errors raised by status parsing and strict-mode transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("No transition defined from {from} to {to}")]
    Undefined { from: JobStatus, to: JobStatus },

    #[error("Unknown job status: '{0}'")]
    UnknownStatus(String),
}
