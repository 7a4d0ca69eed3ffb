//! Remote job monitors
//!
//! A monitor observes one job on its execution host until the job leaves
//! the scheduler queue and then until it finishes. Each monitor owns a
//! snapshot of the job's remote coordinates and opens a fresh executor per
//! query; the only state it keeps between queries is the exit code it
//! observed last.
//!
//! Strategies, by (job type, runtime, scheduler):
//! - FORK + DOCKER: [`DockerNativeMonitor`], completion is detected elsewhere
//! - FORK + SINGULARITY (start): [`SingularityStartMonitor`]
//! - FORK + SINGULARITY (run): [`SingularityRunMonitor`]
//! - BATCH + DOCKER + SLURM: [`DockerSlurmMonitor`]

mod docker;
mod policy;
mod poller;
mod singularity;
mod slurm;

pub use docker::DockerNativeMonitor;
pub use policy::{MonitorPolicy, PolicyConfig, PolicyStep, PolicyValidationError};
pub use poller::{poll_until, PollStep};
pub use singularity::{SingularityRunMonitor, SingularityStartMonitor};
pub use slurm::{DockerSlurmMonitor, SacctRecord, SlurmState};

pub use crate::model::RemoteOutcome;

use std::sync::Arc;

use uuid::Uuid;

use crate::dispatch::{DispatchError, StrategyKey};
use crate::model::{JobContext, JobType, RuntimeType, SchedulerType, SingularityMode};
use crate::remote::Connector;

/// Result of one remote status query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Nothing could be determined (query not applicable or not reachable)
    Null,
    /// The query ran but found nothing for this job
    Empty,
    /// Still running
    Active,
    /// Finished with a non-zero exit code
    Failed,
    /// Finished successfully
    Done,
}

impl RemoteStatus {
    /// Poll step for the running phase.
    pub fn running_step(self) -> PollStep<RemoteOutcome> {
        match self {
            RemoteStatus::Null | RemoteStatus::Active => PollStep::Pending,
            RemoteStatus::Empty => PollStep::Empty,
            RemoteStatus::Done => PollStep::Ready(RemoteOutcome::Finished),
            RemoteStatus::Failed => PollStep::Ready(RemoteOutcome::Failed),
        }
    }
}

/// Monitoring errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MonitorError {
    #[error("Job {job}: remote status query returned no result")]
    EmptyResult { job: Uuid },

    #[error("Job {job}: gave up monitoring after {attempts} polls over {elapsed_seconds}s")]
    PolicyExhausted {
        job: Uuid,
        attempts: u32,
        elapsed_seconds: u64,
    },

    #[error("Job {job}: no remote job id assigned")]
    MissingRemoteId { job: Uuid },
}

/// Strategy for observing one job on its execution host.
pub trait JobMonitor: Send {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Block until the job has left the scheduler queue. Jobs launched
    /// directly are never queued.
    fn monitor_queued_job(&mut self) -> Result<(), MonitorError> {
        Ok(())
    }

    /// Block until the job has finished on the host, or until monitoring
    /// is handed to another component.
    fn monitor_running_job(&mut self) -> Result<RemoteOutcome, MonitorError>;

    /// Application exit code observed by the last query, if any.
    fn exit_code(&self) -> Option<&str>;

    /// Whether an empty query result counts as "keep polling".
    fn allow_empty_result(&self) -> bool {
        false
    }

    /// Best-effort removal of leftover remote resources. Never fails.
    fn cleanup(&mut self) {}
}

/// Choose the monitor for a job.
pub fn monitor_for(
    ctx: &JobContext,
    connector: Arc<dyn Connector>,
    policy: MonitorPolicy,
) -> Result<Box<dyn JobMonitor>, DispatchError> {
    let key = StrategyKey::resolve(ctx)?;
    let target = ctx.target();

    let monitor: Box<dyn JobMonitor> = match (key.job_type, key.runtime, key.mode, key.scheduler) {
        (JobType::Fork, RuntimeType::Docker, _, _) => Box::new(DockerNativeMonitor::new(target)),
        (JobType::Fork, RuntimeType::Singularity, Some(SingularityMode::Start), _) => {
            Box::new(SingularityStartMonitor::new(target, connector, policy))
        }
        (JobType::Fork, RuntimeType::Singularity, Some(SingularityMode::Run), _) => {
            Box::new(SingularityRunMonitor::new(target, connector, policy))
        }
        (JobType::Batch, RuntimeType::Docker, _, Some(SchedulerType::Slurm)) => {
            Box::new(DockerSlurmMonitor::new(target, connector, policy))
        }
        _ => {
            return Err(DispatchError::Unsupported {
                component: "monitor",
                key,
            })
        }
    };
    Ok(monitor)
}
