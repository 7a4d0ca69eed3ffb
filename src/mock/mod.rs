//! Mock Execution Host
//!
//! A scripted stand-in for a remote execution host, used by unit and
//! integration tests of monitors and cancelers.
//!
//! # Behaviour
//!
//! - Responses are scripted per command prefix; the first matching script wins
//! - A script may hold a sequence of outputs; the last one repeats
//! - Unscripted commands succeed with empty output
//! - Every executed command line is recorded
//! - Failures can be injected per command prefix or on connection open

mod failure;
mod host;

pub use failure::{FailureConfig, FailureInjector, InjectedFailure};
pub use host::{MockConnector, MockExecutor, MockHost};
