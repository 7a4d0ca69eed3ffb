//! Singularity monitors
//!
//! Both launch styles are tracked through the host's process listing. For
//! `instance start` jobs the remote id names the instance's sinit process,
//! and the job is running while sinit still has its startscript child. For
//! `run` jobs the remote id names the launching process, and the job is
//! running while that process still has its runscript child.
//!
//! Once the job's process is gone the leftovers are removed and the exit
//! code file in the job output directory decides between success and
//! failure. An absent or unreadable file counts as success.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::policy::MonitorPolicy;
use super::poller::poll_until;
use super::{JobMonitor, MonitorError, RemoteOutcome, RemoteStatus};
use crate::model::JobTarget;
use crate::proctree::{InstanceTree, RunTree};
use crate::remote::{commands, CommandOutput, Connector, ExecError, RemoteExecutor};

/// Process-listing access for one job. Holds the last observed exit code.
struct ProcessProbe {
    target: JobTarget,
    connector: Arc<dyn Connector>,
    exit_code: Option<String>,
}

impl ProcessProbe {
    fn new(target: JobTarget, connector: Arc<dyn Connector>) -> Self {
        Self {
            target,
            connector,
            exit_code: None,
        }
    }

    fn remote_id(&self) -> Result<String, MonitorError> {
        self.target
            .remote_id
            .clone()
            .ok_or(MonitorError::MissingRemoteId { job: self.target.uuid })
    }

    /// Fresh executor plus the current process listing. None when the host
    /// could not be queried.
    fn list(&self) -> Option<(Box<dyn RemoteExecutor>, String)> {
        let mut exec = match self.connector.open(&self.target.system) {
            Ok(exec) => exec,
            Err(err) => {
                warn!(job = %self.target.uuid, system = %self.target.system.id, error = %err, "cannot reach execution host");
                return None;
            }
        };

        match exec.execute(commands::PS_COMMAND) {
            Ok(output) => {
                output.log_non_zero_exit_code(commands::PS_COMMAND, "process listing");
                let listing = output.out_as_string().to_string();
                Some((exec, listing))
            }
            Err(err) => {
                warn!(job = %self.target.uuid, error = %err, "process listing failed");
                None
            }
        }
    }

    /// Run a removal command, logging but otherwise ignoring any failure.
    fn remove(&self, exec: &mut dyn RemoteExecutor, command: &str) {
        match exec.execute(command) {
            Ok(output) => {
                if output.log_non_zero_exit_code(command, "job cleanup") {
                    debug!(job = %self.target.uuid, command, "removed job leftovers");
                }
            }
            Err(err) => warn!(job = %self.target.uuid, command, error = %err, "job cleanup failed"),
        }
    }

    /// Read the exit code file and record what it says.
    fn conclude(&mut self, exec: &mut dyn RemoteExecutor) -> RemoteStatus {
        let result = exec.execute(&commands::cat(&self.target.exit_code_file));
        let (status, code) = classify_exit_code(result);
        info!(job = %self.target.uuid, ?status, exit_code = code.as_deref(), "job process has terminated");
        self.exit_code = code;
        status
    }

    fn query_instance(&mut self, active: bool) -> Result<RemoteStatus, MonitorError> {
        if !active {
            return Ok(RemoteStatus::Null);
        }
        let remote_id = self.remote_id()?;
        let Some((mut exec, listing)) = self.list() else {
            return Ok(RemoteStatus::Null);
        };
        if listing.is_empty() {
            return Ok(RemoteStatus::Empty);
        }

        let tree = InstanceTree::scan(&listing, &remote_id, &self.target.uuid.to_string());
        if tree.sinit.is_none() {
            warn!(job = %self.target.uuid, remote_id = %remote_id, "sinit process for singularity instance not found");
            return Ok(RemoteStatus::Empty);
        }
        if tree.startscript.is_some() {
            return Ok(RemoteStatus::Active);
        }

        self.remove(exec.as_mut(), &commands::singularity_instance_stop(&self.target.uuid));
        Ok(self.conclude(exec.as_mut()))
    }

    fn query_run(&mut self, active: bool) -> Result<RemoteStatus, MonitorError> {
        if !active {
            return Ok(RemoteStatus::Null);
        }
        let remote_id = self.remote_id()?;
        let Some((mut exec, listing)) = self.list() else {
            return Ok(RemoteStatus::Null);
        };
        if listing.is_empty() {
            return Ok(RemoteStatus::Empty);
        }

        let tree = RunTree::scan(&listing, &remote_id);
        if tree.parent.is_none() {
            debug!(job = %self.target.uuid, remote_id = %remote_id, "singularity run parent is gone");
            return Ok(self.conclude(exec.as_mut()));
        }
        if tree.runscript.is_some() {
            return Ok(RemoteStatus::Active);
        }

        self.remove(exec.as_mut(), &commands::singularity_run_kill(&remote_id));
        Ok(self.conclude(exec.as_mut()))
    }
}

/// Decide the outcome from an attempt to read the exit code file.
///
/// Only a readable non-zero integer means failure; a missing file, a read
/// error and garbled contents all count as success.
fn classify_exit_code(
    result: Result<CommandOutput, ExecError>,
) -> (RemoteStatus, Option<String>) {
    let output = match result {
        Ok(output) => output,
        Err(err) => {
            warn!(error = %err, "cannot read exit code file, assuming success");
            return (RemoteStatus::Done, None);
        }
    };
    if !output.success() {
        debug!(exit_code = output.exit_code, "no exit code file, assuming success");
        return (RemoteStatus::Done, None);
    }

    let text = output.out_as_string();
    match text.parse::<i32>() {
        Ok(0) => (RemoteStatus::Done, Some("0".to_string())),
        Ok(code) => (RemoteStatus::Failed, Some(code.to_string())),
        Err(_) => {
            warn!(content = text, "exit code file is not an integer, assuming success");
            (RemoteStatus::Done, None)
        }
    }
}

/// Monitor for `singularity instance start` jobs.
pub struct SingularityStartMonitor {
    probe: ProcessProbe,
    policy: MonitorPolicy,
}

impl SingularityStartMonitor {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>, policy: MonitorPolicy) -> Self {
        Self {
            probe: ProcessProbe::new(target, connector),
            policy,
        }
    }

    /// One status query. An inactive query returns [`RemoteStatus::Null`]
    /// without touching the host.
    pub fn query_remote_job(&mut self, active: bool) -> Result<RemoteStatus, MonitorError> {
        self.probe.query_instance(active)
    }
}

impl JobMonitor for SingularityStartMonitor {
    fn name(&self) -> &'static str {
        "singularity-start"
    }

    fn monitor_running_job(&mut self) -> Result<RemoteOutcome, MonitorError> {
        let job = self.probe.target.uuid;
        let allow_empty = self.allow_empty_result();
        let probe = &mut self.probe;
        poll_until(job, &mut self.policy, allow_empty, || {
            Ok(probe.query_instance(true)?.running_step())
        })
    }

    fn exit_code(&self) -> Option<&str> {
        self.probe.exit_code.as_deref()
    }

    fn cleanup(&mut self) {
        let job = self.probe.target.uuid;
        let Ok(remote_id) = self.probe.remote_id() else {
            debug!(%job, "no remote id, nothing to clean up");
            return;
        };
        let Some((mut exec, listing)) = self.probe.list() else {
            return;
        };

        let tree = InstanceTree::scan(&listing, &remote_id, &job.to_string());
        if tree.instance.is_none() && tree.sinit.is_none() {
            debug!(%job, "singularity instance already gone");
        } else if tree.startscript.is_some() || tree.app.is_some() {
            debug!(%job, "job processes still present, leaving instance alone");
        } else {
            self.probe
                .remove(exec.as_mut(), &commands::singularity_instance_stop(&job));
        }
    }
}

/// Monitor for `singularity run` jobs.
pub struct SingularityRunMonitor {
    probe: ProcessProbe,
    policy: MonitorPolicy,
}

impl SingularityRunMonitor {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>, policy: MonitorPolicy) -> Self {
        Self {
            probe: ProcessProbe::new(target, connector),
            policy,
        }
    }

    pub fn query_remote_job(&mut self, active: bool) -> Result<RemoteStatus, MonitorError> {
        self.probe.query_run(active)
    }
}

impl JobMonitor for SingularityRunMonitor {
    fn name(&self) -> &'static str {
        "singularity-run"
    }

    fn monitor_running_job(&mut self) -> Result<RemoteOutcome, MonitorError> {
        let job = self.probe.target.uuid;
        let allow_empty = self.allow_empty_result();
        let probe = &mut self.probe;
        poll_until(job, &mut self.policy, allow_empty, || {
            Ok(probe.query_run(true)?.running_step())
        })
    }

    fn exit_code(&self) -> Option<&str> {
        self.probe.exit_code.as_deref()
    }

    fn cleanup(&mut self) {
        let job = self.probe.target.uuid;
        let Ok(remote_id) = self.probe.remote_id() else {
            debug!(%job, "no remote id, nothing to clean up");
            return;
        };
        let Some((mut exec, listing)) = self.probe.list() else {
            return;
        };

        let tree = RunTree::scan(&listing, &remote_id);
        if tree.parent.is_none() {
            debug!(%job, "singularity run process already gone");
        } else if tree.runscript.is_some() || tree.app.is_some() {
            debug!(%job, "job processes still present, leaving them alone");
        } else {
            self.probe
                .remove(exec.as_mut(), &commands::singularity_run_kill(&remote_id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_zero() {
        let (status, code) = classify_exit_code(Ok(CommandOutput::new("0\n", 0)));
        assert_eq!(status, RemoteStatus::Done);
        assert_eq!(code.as_deref(), Some("0"));
    }

    #[test]
    fn test_exit_code_non_zero() {
        let (status, code) = classify_exit_code(Ok(CommandOutput::new(" 137 ", 0)));
        assert_eq!(status, RemoteStatus::Failed);
        assert_eq!(code.as_deref(), Some("137"));
    }

    #[test]
    fn test_missing_file_is_success() {
        let missing = CommandOutput::new("cat: /out/tapisjob.exitcode: No such file or directory", 1);
        assert_eq!(classify_exit_code(Ok(missing)), (RemoteStatus::Done, None));
    }

    #[test]
    fn test_garbled_file_is_success() {
        assert_eq!(
            classify_exit_code(Ok(CommandOutput::new("exit=3", 0))),
            (RemoteStatus::Done, None)
        );
        assert_eq!(
            classify_exit_code(Ok(CommandOutput::new("", 0))),
            (RemoteStatus::Done, None)
        );
    }

    #[test]
    fn test_read_error_is_success() {
        let err = ExecError::Timeout { seconds: 5 };
        assert_eq!(classify_exit_code(Err(err)), (RemoteStatus::Done, None));
    }
}
