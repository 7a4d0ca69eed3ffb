//! Best-effort job cancellation
//!
//! A canceler issues one remote command that stops the job's container,
//! instance, process or scheduler job. By the time cancellation is asked
//! for the job may be gone, the host unreachable or the remote id never
//! assigned, so [`JobCanceler::cancel`] logs failures and returns
//! normally. [`JobCanceler::try_cancel`] exposes the failure for callers
//! that want it.
//!
//! Strategies, by (job type, runtime, scheduler):
//! - FORK + DOCKER: [`DockerNativeCanceler`], `docker rm -f <uuid>`
//! - FORK + SINGULARITY (start): [`SingularityStartCanceler`], `singularity instance stop <uuid>`
//! - FORK + SINGULARITY (run): [`SingularityRunCanceler`], `kill -9 <pid>`
//! - BATCH + SINGULARITY + SLURM: [`SlurmCanceler`], `scancel <id>`
//! - BATCH + DOCKER + SLURM: recognized but not implemented

mod cancelers;

pub use cancelers::{DockerNativeCanceler, SingularityRunCanceler, SingularityStartCanceler, SlurmCanceler};

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::dispatch::{DispatchError, StrategyKey};
use crate::model::{JobContext, JobTarget, JobType, RuntimeType, SchedulerType, SingularityMode};
use crate::remote::{Connector, ExecError};

/// Cancellation errors
#[derive(Debug, thiserror::Error)]
pub enum CancelError {
    #[error("Job {job}: no remote job id assigned, nothing to cancel")]
    MissingRemoteId { job: Uuid },

    #[error("Job {job}: cancel command failed: {source}")]
    Exec {
        job: Uuid,
        #[source]
        source: ExecError,
    },
}

/// Strategy for stopping one job on its execution host.
pub trait JobCanceler: Send {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Issue the cancel command. A non-zero exit is logged, not an error.
    fn try_cancel(&mut self) -> Result<(), CancelError>;

    /// Issue the cancel command, logging instead of returning any failure.
    fn cancel(&mut self) {
        match self.try_cancel() {
            Ok(()) => debug!(canceler = self.name(), "cancel command issued"),
            Err(err) => warn!(canceler = self.name(), error = %err, "cancel failed, continuing"),
        }
    }
}

/// Open a fresh executor and run one cancel command.
fn run_cancel_command(
    target: &JobTarget,
    connector: &dyn Connector,
    command: &str,
) -> Result<(), CancelError> {
    let exec_err = |source| CancelError::Exec {
        job: target.uuid,
        source,
    };
    let mut exec = connector.open(&target.system).map_err(exec_err)?;
    let output = exec.execute(command).map_err(exec_err)?;
    if output.log_non_zero_exit_code(command, "job cancel") {
        debug!(job = %target.uuid, command, "job cancel command succeeded");
    }
    Ok(())
}

/// Choose the canceler for a job.
pub fn canceler_for(ctx: &JobContext, connector: Arc<dyn Connector>) -> Result<Box<dyn JobCanceler>, DispatchError> {
    let key = StrategyKey::resolve(ctx)?;
    let target = ctx.target();

    let canceler: Box<dyn JobCanceler> = match (key.job_type, key.runtime, key.mode, key.scheduler) {
        (JobType::Fork, RuntimeType::Docker, _, _) => Box::new(DockerNativeCanceler::new(target, connector)),
        (JobType::Fork, RuntimeType::Singularity, Some(SingularityMode::Start), _) => {
            Box::new(SingularityStartCanceler::new(target, connector))
        }
        (JobType::Fork, RuntimeType::Singularity, Some(SingularityMode::Run), _) => {
            Box::new(SingularityRunCanceler::new(target, connector))
        }
        (JobType::Batch, RuntimeType::Singularity, _, Some(SchedulerType::Slurm)) => {
            Box::new(SlurmCanceler::new(target, connector))
        }
        (JobType::Batch, RuntimeType::Docker, _, Some(SchedulerType::Slurm)) => {
            return Err(DispatchError::NotImplemented {
                component: "canceler",
                key,
            })
        }
        _ => {
            return Err(DispatchError::Unsupported {
                component: "canceler",
                key,
            })
        }
    };
    Ok(canceler)
}
