//! Remote command execution
//!
//! Abstracts the connection to an execution host for testability:
//! - [`RemoteExecutor`]: runs one command line, returns stdout and exit code
//! - [`Connector`]: opens a fresh executor for an execution system
//! - [`SshConnector`]: system `ssh` binary with per-command deadlines

pub mod commands;
pub mod shell;
mod ssh;

pub use ssh::{SshConfig, SshConnector, SshExecutor};

use std::io;

use tracing::warn;

use crate::model::ExecSystem;

/// Captured result of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            exit_code,
        }
    }

    /// Stdout with surrounding whitespace removed.
    pub fn out_as_string(&self) -> &str {
        self.stdout.trim()
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Warn about a non-zero exit. Returns true when the exit code was zero.
    pub fn log_non_zero_exit_code(&self, command: &str, context: &str) -> bool {
        if self.success() {
            return true;
        }
        warn!(
            exit_code = self.exit_code,
            command,
            output = self.out_as_string(),
            "{context}: remote command exited non-zero"
        );
        false
    }
}

/// Remote execution errors
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Command timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to spawn ssh: {0}")]
    Spawn(String),
}

/// Runs command lines on one execution host.
pub trait RemoteExecutor: Send {
    fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError>;
}

/// Opens command executors. Every query gets a fresh one; pooling, if any,
/// lives behind this trait.
pub trait Connector: Send + Sync {
    fn open(&self, system: &ExecSystem) -> Result<Box<dyn RemoteExecutor>, ExecError>;
}
