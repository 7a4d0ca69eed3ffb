//! SSH command execution
//!
//! Runs one remote command per `ssh` invocation. Each invocation carries a
//! wall-clock deadline so a hung host cannot stall a poll loop.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{CommandOutput, Connector, ExecError, RemoteExecutor};
use crate::model::ExecSystem;

/// ssh reserves 255 for its own failures.
const SSH_ERROR_EXIT: i32 = 255;

const WAIT_SLICE: Duration = Duration::from_millis(50);

/// SSH connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    /// User when the execution system names none
    pub user: String,
    /// Path to SSH private key
    pub key_path: Option<String>,
    /// Connection timeout in seconds
    pub connect_timeout_seconds: u64,
    /// Server alive interval for detecting dead connections
    pub server_alive_interval: u32,
    /// Server alive count max
    pub server_alive_count_max: u32,
    /// Deadline for one remote command, connection included
    pub command_timeout_seconds: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "tapis".to_string(),
            key_path: None,
            connect_timeout_seconds: 30,
            server_alive_interval: 15,
            server_alive_count_max: 2,
            command_timeout_seconds: 120,
        }
    }
}

/// Opens an [`SshExecutor`] per execution system.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    config: SshConfig,
}

impl SshConnector {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }
}

impl Connector for SshConnector {
    fn open(&self, system: &ExecSystem) -> Result<Box<dyn RemoteExecutor>, ExecError> {
        if system.host.trim().is_empty() {
            return Err(ExecError::ConnectionFailed(format!(
                "execution system '{}' has no host",
                system.id
            )));
        }
        Ok(Box::new(SshExecutor::new(self.config.clone(), system)))
    }
}

/// Executes commands on one host through the system `ssh` binary.
pub struct SshExecutor {
    config: SshConfig,
    host: String,
    port: u16,
    user: String,
}

impl SshExecutor {
    pub fn new(config: SshConfig, system: &ExecSystem) -> Self {
        let user = system
            .effective_user
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| config.user.clone());
        Self {
            host: system.host.clone(),
            port: system.port,
            user,
            config,
        }
    }

    /// Build SSH command arguments
    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_seconds),
            "-o".to_string(),
            format!("ServerAliveInterval={}", self.config.server_alive_interval),
            "-o".to_string(),
            format!("ServerAliveCountMax={}", self.config.server_alive_count_max),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-p".to_string(),
            self.port.to_string(),
        ];

        if let Some(ref key_path) = self.config.key_path {
            args.push("-i".to_string());
            args.push(key_path.clone());
        }

        args.push(format!("{}@{}", self.user, self.host));
        args.push(command.to_string());

        args
    }

    fn wait_with_deadline(&self, child: &mut Child) -> Result<i32, ExecError> {
        let timeout = Duration::from_secs(self.config.command_timeout_seconds);
        let deadline = Instant::now() + timeout;
        loop {
            let status = match child.try_wait() {
                Ok(status) => status,
                Err(err) => {
                    reap(child);
                    return Err(err.into());
                }
            };
            if let Some(status) = status {
                return Ok(status.code().unwrap_or(-1));
            }
            if Instant::now() >= deadline {
                reap(child);
                return Err(ExecError::Timeout {
                    seconds: self.config.command_timeout_seconds,
                });
            }
            thread::sleep(WAIT_SLICE);
        }
    }
}

/// Kill and wait for a child that is being abandoned. Closing its pipes
/// also ends the drain threads.
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        buf
    })
}

impl RemoteExecutor for SshExecutor {
    fn execute(&mut self, command: &str) -> Result<CommandOutput, ExecError> {
        trace!(host = %self.host, command, "ssh exec");

        let mut child = Command::new("ssh")
            .args(self.build_ssh_args(command))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn(e.to_string()))?;

        // Pipes must keep draining while the deadline is watched
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let exit_code = self.wait_with_deadline(&mut child)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if exit_code == SSH_ERROR_EXIT {
            return Err(ExecError::ConnectionFailed(format!(
                "{}@{}:{}: {}",
                self.user,
                self.host,
                self.port,
                String::from_utf8_lossy(&stderr).trim()
            )));
        }

        debug!(host = %self.host, exit_code, "ssh command finished");
        Ok(CommandOutput::new(
            String::from_utf8_lossy(&stdout).into_owned(),
            exit_code,
        ))
    }
}
