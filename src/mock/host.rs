//! Mock Host Implementation
//!
//! Scripted execution host shared by every executor a [`MockConnector`]
//! hands out.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::failure::{FailureConfig, FailureInjector};
use crate::model::ExecSystem;
use crate::remote::{CommandOutput, Connector, ExecError, RemoteExecutor};

#[derive(Debug)]
struct Script {
    prefix: String,
    outputs: VecDeque<CommandOutput>,
}

#[derive(Debug, Default)]
struct HostState {
    scripts: Vec<Script>,
    failures: FailureInjector,
    commands: Vec<String>,
    opened: u32,
    open_failures: Option<u32>,
}

/// Configurable mock host for testing
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<HostState>>,
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        // A panicking test thread must not hide the host from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer commands starting with `prefix` with a fixed output.
    pub fn respond(&self, prefix: &str, stdout: &str, exit_code: i32) {
        self.respond_sequence(prefix, vec![CommandOutput::new(stdout, exit_code)]);
    }

    /// Answer successive matching commands with `outputs` in order; the last
    /// output repeats once the others are used up.
    pub fn respond_sequence(&self, prefix: &str, outputs: Vec<CommandOutput>) {
        let mut state = self.lock();
        state.scripts.retain(|s| s.prefix != prefix);
        state.scripts.push(Script {
            prefix: prefix.to_string(),
            outputs: outputs.into(),
        });
    }

    pub fn inject_failure(&self, prefix: &str, config: FailureConfig) {
        self.lock().failures.inject(prefix, config);
    }

    pub fn inject_failure_all(&self, config: FailureConfig) {
        self.lock().failures.inject_all(config);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Fail the next `count` connection attempts (None = all of them).
    pub fn fail_open(&self, count: Option<u32>) {
        self.lock().open_failures = Some(count.unwrap_or(u32::MAX));
    }

    /// Every command line executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub fn commands_starting_with(&self, prefix: &str) -> Vec<String> {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of executors handed out.
    pub fn opened(&self) -> u32 {
        self.lock().opened
    }

    fn open(&self) -> Result<(), ExecError> {
        let mut state = self.lock();
        if let Some(remaining) = state.open_failures {
            if remaining > 0 {
                state.open_failures = Some(remaining - 1);
                return Err(ExecError::ConnectionFailed(
                    "injected open failure".to_string(),
                ));
            }
        }
        state.opened += 1;
        Ok(())
    }

    fn execute(&self, command: &str) -> Result<CommandOutput, ExecError> {
        let mut state = self.lock();
        state.commands.push(command.to_string());

        if let Some(failure) = state.failures.check(command) {
            return failure.into_result();
        }

        let script = state
            .scripts
            .iter_mut()
            .find(|s| command.starts_with(s.prefix.as_str()));

        let output = match script {
            Some(script) if script.outputs.len() > 1 => script.outputs.pop_front(),
            Some(script) => script.outputs.front().cloned(),
            None => None,
        };

        Ok(output.unwrap_or_else(|| CommandOutput::new("", 0)))
    }
}

/// Connector handing out executors bound to one [`MockHost`]
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    host: MockHost,
}

impl MockConnector {
    pub fn new(host: MockHost) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &MockHost {
        &self.host
    }
}

impl Connector for MockConnector {
    fn open(&self, _system: &ExecSystem) -> Result<Box<dyn RemoteExecutor>, ExecError> {
        self.host.open()?;
        Ok(Box::new(MockExecutor {
            host: self.host.clone(),
        }))
    }
}

/// Executor bound to a [`MockHost`]
#[derive(Debug, Clone)]
pub struct MockExecutor {
    host: MockHost,
}

impl RemoteExecutor for MockExecutor {
    fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError> {
        self.host.execute(command)
    }
}
