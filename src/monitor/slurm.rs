//! Slurm-scheduled Docker jobs
//!
//! Status comes from `sacct --parsable2`, one `JobID|State|ExitCode` line per
//! allocation. Accounting records can lag submission, so an empty answer
//! means "keep polling" for this monitor.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::policy::MonitorPolicy;
use super::poller::{poll_until, PollStep};
use super::{JobMonitor, MonitorError, RemoteOutcome, RemoteStatus};
use crate::model::JobTarget;
use crate::remote::{commands, Connector};

/// Coarse Slurm job state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlurmState {
    /// Waiting for resources or held
    Queued,
    /// Allocated and executing, or winding down
    Running,
    Completed,
    /// Any other terminal state (FAILED, CANCELLED, TIMEOUT, ...)
    Failed,
    /// A state this parser does not know
    Unknown,
}

impl SlurmState {
    /// Classify a raw sacct state such as `CANCELLED by 1000` or `RUNNING+`.
    pub fn parse(raw: &str) -> Self {
        match normalize_slurm_state(raw).as_str() {
            "PENDING" | "CONFIGURING" | "REQUEUED" | "REQUEUE_HOLD" | "REQUEUE_FED" | "SUSPENDED"
            | "RESV_DEL_HOLD" => SlurmState::Queued,
            "RUNNING" | "COMPLETING" | "STAGE_IN" | "STAGE_OUT" | "SIGNALING" | "RESIZING" | "STOPPED" => {
                SlurmState::Running
            }
            "COMPLETED" => SlurmState::Completed,
            "CANCELLED" | "FAILED" | "TIMEOUT" | "NODE_FAIL" | "PREEMPTED" | "BOOT_FAIL" | "OUT_OF_MEMORY"
            | "DEADLINE" | "SPECIAL_EXIT" | "REVOKED" => SlurmState::Failed,
            _ => SlurmState::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SlurmState::Completed | SlurmState::Failed)
    }
}

fn normalize_slurm_state(state: &str) -> String {
    let token = state
        .split(|c: char| c == '+' || c == '(' || c.is_whitespace())
        .next()
        .unwrap_or(state)
        .trim();
    token.to_ascii_uppercase()
}

/// One sacct allocation line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SacctRecord {
    pub job_id: String,
    pub state: SlurmState,
    pub raw_state: String,
    /// `code:signal`
    pub exit_code: String,
}

impl SacctRecord {
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim().split('|');
        let job_id = fields.next()?.trim();
        let raw_state = fields.next()?.trim();
        let exit_code = fields.next().unwrap_or("").trim();
        if job_id.is_empty() || raw_state.is_empty() {
            return None;
        }
        Some(Self {
            job_id: job_id.to_string(),
            state: SlurmState::parse(raw_state),
            raw_state: raw_state.to_string(),
            exit_code: exit_code.to_string(),
        })
    }

    /// Record for `job_id` in sacct output, falling back to the first
    /// parseable line.
    pub fn find(output: &str, job_id: &str) -> Option<Self> {
        let records: Vec<Self> = output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(Self::parse)
            .collect();
        let position = records.iter().position(|r| r.job_id == job_id).unwrap_or(0);
        records.into_iter().nth(position)
    }

    /// Application exit status, the part of `code:signal` before the colon.
    pub fn exit_status(&self) -> Option<&str> {
        let code = self.exit_code.split(':').next()?.trim();
        (!code.is_empty()).then_some(code)
    }

    /// Completed with exit code and signal both zero.
    pub fn succeeded(&self) -> bool {
        self.state == SlurmState::Completed
            && self
                .exit_code
                .split(':')
                .all(|part| part.trim().parse::<i32>() == Ok(0))
    }
}

/// Outcome of one accounting query
#[derive(Debug)]
enum Accounting {
    /// Host unreachable or the query failed
    Unavailable,
    /// The query ran but returned no record
    NoRecord,
    Record(SacctRecord),
}

/// Accounting access for one job. Holds the last observed exit code.
struct AccountingProbe {
    target: JobTarget,
    connector: Arc<dyn Connector>,
    exit_code: Option<String>,
}

impl AccountingProbe {
    fn query(&self) -> Result<Accounting, MonitorError> {
        let target = &self.target;
        let remote_id = target
            .remote_id
            .as_deref()
            .ok_or(MonitorError::MissingRemoteId { job: target.uuid })?;

        let mut exec = match self.connector.open(&target.system) {
            Ok(exec) => exec,
            Err(err) => {
                warn!(job = %target.uuid, system = %target.system.id, error = %err, "cannot reach execution host");
                return Ok(Accounting::Unavailable);
            }
        };
        let command = commands::slurm_accounting(remote_id);
        let output = match exec.execute(&command) {
            Ok(output) => output,
            Err(err) => {
                warn!(job = %target.uuid, error = %err, "slurm accounting query failed");
                return Ok(Accounting::Unavailable);
            }
        };
        if !output.log_non_zero_exit_code(&command, "slurm accounting") {
            return Ok(Accounting::Unavailable);
        }

        let record = SacctRecord::find(output.out_as_string(), remote_id);
        debug!(job = %target.uuid, remote_id, ?record, "slurm accounting");
        Ok(record.map_or(Accounting::NoRecord, Accounting::Record))
    }

    fn status(&mut self) -> Result<RemoteStatus, MonitorError> {
        let record = match self.query()? {
            Accounting::Unavailable => return Ok(RemoteStatus::Null),
            Accounting::NoRecord => return Ok(RemoteStatus::Empty),
            Accounting::Record(record) => record,
        };

        Ok(match record.state {
            SlurmState::Queued | SlurmState::Running => RemoteStatus::Active,
            SlurmState::Unknown => {
                warn!(job = %self.target.uuid, state = %record.raw_state, "unrecognized slurm state");
                RemoteStatus::Active
            }
            SlurmState::Completed | SlurmState::Failed => {
                self.exit_code = record.exit_status().map(str::to_string);
                info!(job = %self.target.uuid, state = %record.raw_state, exit_code = %record.exit_code, "slurm job finished");
                if record.succeeded() {
                    RemoteStatus::Done
                } else {
                    RemoteStatus::Failed
                }
            }
        })
    }
}

/// Monitor for Docker jobs submitted through Slurm.
pub struct DockerSlurmMonitor {
    probe: AccountingProbe,
    policy: MonitorPolicy,
}

impl DockerSlurmMonitor {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>, policy: MonitorPolicy) -> Self {
        Self {
            probe: AccountingProbe {
                target,
                connector,
                exit_code: None,
            },
            policy,
        }
    }

    /// One status query. An inactive query returns [`RemoteStatus::Null`]
    /// without touching the host.
    pub fn query_remote_job(&mut self, active: bool) -> Result<RemoteStatus, MonitorError> {
        if !active {
            return Ok(RemoteStatus::Null);
        }
        self.probe.status()
    }
}

impl JobMonitor for DockerSlurmMonitor {
    fn name(&self) -> &'static str {
        "docker-slurm"
    }

    fn monitor_queued_job(&mut self) -> Result<(), MonitorError> {
        let job = self.probe.target.uuid;
        let allow_empty = self.allow_empty_result();
        let probe = &self.probe;
        poll_until(job, &mut self.policy, allow_empty, || {
            Ok(match probe.query()? {
                Accounting::Unavailable => PollStep::Pending,
                Accounting::NoRecord => PollStep::Empty,
                Accounting::Record(record) if record.state == SlurmState::Queued => PollStep::Pending,
                Accounting::Record(record) => {
                    debug!(%job, state = %record.raw_state, "slurm job left the queue");
                    PollStep::Ready(())
                }
            })
        })
    }

    fn monitor_running_job(&mut self) -> Result<RemoteOutcome, MonitorError> {
        let job = self.probe.target.uuid;
        let allow_empty = self.allow_empty_result();
        let probe = &mut self.probe;
        poll_until(job, &mut self.policy, allow_empty, || Ok(probe.status()?.running_step()))
    }

    fn exit_code(&self) -> Option<&str> {
        self.probe.exit_code.as_deref()
    }

    fn allow_empty_result(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse() {
        assert_eq!(SlurmState::parse("PENDING"), SlurmState::Queued);
        assert_eq!(SlurmState::parse("running"), SlurmState::Running);
        assert_eq!(SlurmState::parse("CANCELLED by 1000"), SlurmState::Failed);
        assert_eq!(SlurmState::parse("COMPLETED"), SlurmState::Completed);
        assert_eq!(SlurmState::parse("RUNNING+"), SlurmState::Running);
        assert_eq!(SlurmState::parse("WEIRD"), SlurmState::Unknown);
        assert!(SlurmState::parse("TIMEOUT").is_terminal());
        assert!(!SlurmState::parse("SUSPENDED").is_terminal());
    }

    #[test]
    fn test_record_parse() {
        let record = SacctRecord::parse("1001|COMPLETED|0:0").unwrap();
        assert_eq!(record.job_id, "1001");
        assert_eq!(record.state, SlurmState::Completed);
        assert!(record.succeeded());
        assert_eq!(record.exit_status(), Some("0"));

        assert!(SacctRecord::parse("1001").is_none());
        assert!(SacctRecord::parse("|RUNNING|0:0").is_none());
    }

    #[test]
    fn test_failed_exit_status() {
        let record = SacctRecord::parse("1001|FAILED|2:0").unwrap();
        assert!(!record.succeeded());
        assert_eq!(record.exit_status(), Some("2"));

        let killed = SacctRecord::parse("1001|COMPLETED|0:9").unwrap();
        assert!(!killed.succeeded());
    }

    #[test]
    fn test_find_prefers_matching_id() {
        let output = "1000|RUNNING|0:0\n1001|PENDING|0:0\n";
        assert_eq!(SacctRecord::find(output, "1001").unwrap().state, SlurmState::Queued);
        assert_eq!(SacctRecord::find(output, "9999").unwrap().job_id, "1000");
        assert!(SacctRecord::find("", "1001").is_none());
    }
}
