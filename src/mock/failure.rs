//! Failure Injection for the Mock Host
//!
//! Supports configurable failure injection for testing best-effort paths.

use crate::remote::{CommandOutput, ExecError};

/// What an injected failure looks like to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    /// Executor returns `ExecError::ConnectionFailed`
    ConnectionLost,
    /// Executor returns `ExecError::Timeout`
    Timeout { seconds: u64 },
    /// Command runs but exits with this code
    NonZeroExit { exit_code: i32, stdout: String },
}

impl InjectedFailure {
    /// Render as the executor's result
    pub fn into_result(self) -> Result<CommandOutput, ExecError> {
        match self {
            InjectedFailure::ConnectionLost => Err(ExecError::ConnectionFailed(
                "injected connection failure".to_string(),
            )),
            InjectedFailure::Timeout { seconds } => Err(ExecError::Timeout { seconds }),
            InjectedFailure::NonZeroExit { exit_code, stdout } => {
                Ok(CommandOutput::new(stdout, exit_code))
            }
        }
    }
}

/// Failure configuration for a command prefix
#[derive(Debug, Clone)]
pub struct FailureConfig {
    pub failure: InjectedFailure,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    pub fn connection_lost() -> Self {
        Self {
            failure: InjectedFailure::ConnectionLost,
            fail_count: None,
        }
    }

    pub fn timeout(seconds: u64) -> Self {
        Self {
            failure: InjectedFailure::Timeout { seconds },
            fail_count: None,
        }
    }

    pub fn non_zero_exit(exit_code: i32, stdout: impl Into<String>) -> Self {
        Self {
            failure: InjectedFailure::NonZeroExit {
                exit_code,
                stdout: stdout.into(),
            },
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }
}

/// Failure injector keyed by command prefix
#[derive(Debug, Default)]
pub struct FailureInjector {
    /// (prefix, config, calls so far), checked in insertion order
    entries: Vec<(String, FailureConfig, u32)>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inject a failure for commands starting with `prefix`
    pub fn inject(&mut self, prefix: impl Into<String>, config: FailureConfig) {
        let prefix = prefix.into();
        self.entries.retain(|(p, _, _)| *p != prefix);
        self.entries.push((prefix, config, 0));
    }

    /// Inject a failure for every command
    pub fn inject_all(&mut self, config: FailureConfig) {
        self.inject("", config);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Check if a failure should occur for `command`
    pub fn check(&mut self, command: &str) -> Option<InjectedFailure> {
        let (_, config, calls) = self
            .entries
            .iter_mut()
            .find(|(prefix, _, _)| command.starts_with(prefix.as_str()))?;

        *calls += 1;
        if let Some(limit) = config.fail_count {
            if *calls > limit {
                return None;
            }
        }
        Some(config.failure.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_failure_configured() {
        let mut injector = FailureInjector::new();
        assert!(injector.check("ps -e").is_none());
    }

    #[test]
    fn test_prefix_match() {
        let mut injector = FailureInjector::new();
        injector.inject("scancel", FailureConfig::connection_lost());

        assert_eq!(injector.check("scancel 12"), Some(InjectedFailure::ConnectionLost));
        assert!(injector.check("sacct --jobs 12").is_none());
    }

    #[test]
    fn test_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject("ps", FailureConfig::timeout(5).with_fail_count(2));

        assert!(injector.check("ps").is_some());
        assert!(injector.check("ps").is_some());
        assert!(injector.check("ps").is_none());
    }

    #[test]
    fn test_inject_all() {
        let mut injector = FailureInjector::new();
        injector.inject_all(FailureConfig::non_zero_exit(1, ""));
        assert!(injector.check("anything at all").is_some());

        injector.clear();
        assert!(injector.check("anything at all").is_none());
    }

    #[test]
    fn test_into_result() {
        assert!(InjectedFailure::ConnectionLost.into_result().is_err());
        let out = InjectedFailure::NonZeroExit {
            exit_code: 3,
            stdout: "nope".to_string(),
        }
        .into_result()
        .unwrap();
        assert_eq!(out.exit_code, 3);
    }
}
