//! Single-job driver
//!
//! Runs one job through its remote phases: selects the monitor, moves the
//! job to Queued (batch only) and Running as the monitor reports progress,
//! then records the remote outcome and moves the job on. Every status
//! change goes through the strict state machine.

use std::sync::Arc;

use job_status::JobStatus;
use tracing::{info, warn};

use crate::cancel::canceler_for;
use crate::dispatch::DispatchError;
use crate::model::{JobContext, JobError, JobType};
use crate::monitor::{monitor_for, JobMonitor, MonitorError, MonitorPolicy};
use crate::remote::Connector;

/// Tracking errors
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Job(#[from] JobError),
}

pub struct JobTracker {
    connector: Arc<dyn Connector>,
    policy: MonitorPolicy,
}

impl JobTracker {
    pub fn new(connector: Arc<dyn Connector>, policy: MonitorPolicy) -> Self {
        Self { connector, policy }
    }

    /// Follow a submitted job until its remote phase ends. Returns the
    /// job's status afterwards.
    pub fn track(&self, ctx: &mut JobContext) -> Result<JobStatus, TrackError> {
        if ctx.job.is_terminal() {
            info!(job = %ctx.job.uuid, status = %ctx.job.status, "job already finished, nothing to track");
            return Ok(ctx.job.status);
        }

        let mut monitor = monitor_for(ctx, self.connector.clone(), self.policy.clone())?;
        info!(job = %ctx.job.uuid, monitor = monitor.name(), status = %ctx.job.status, "tracking job");

        let result = self.follow(ctx, monitor.as_mut());
        monitor.cleanup();

        if let Err(TrackError::Monitor(err)) = &result {
            warn!(job = %ctx.job.uuid, error = %err, "monitoring failed");
            ctx.job.transition(JobStatus::Failed, err.to_string())?;
        }
        result
    }

    fn follow(&self, ctx: &mut JobContext, monitor: &mut dyn JobMonitor) -> Result<JobStatus, TrackError> {
        if ctx.job.status != JobStatus::Running {
            if ctx.job_type() == JobType::Batch {
                ctx.job.transition(JobStatus::Queued, "Job queued by the batch scheduler")?;
                monitor.monitor_queued_job()?;
            }
            ctx.job.transition(JobStatus::Running, "Job running on the execution system")?;
        }

        let outcome = monitor.monitor_running_job()?;
        ctx.job.record_remote_result(outcome, monitor.exit_code());
        info!(
            job = %ctx.job.uuid,
            ?outcome,
            exit_code = monitor.exit_code(),
            "remote phase ended"
        );

        let message = match monitor.exit_code() {
            Some(code) => format!("Remote phase ended: {:?}, exit code {}", outcome, code),
            None => format!("Remote phase ended: {:?}", outcome),
        };
        ctx.job.transition(outcome.next_status(), message)?;
        Ok(ctx.job.status)
    }

    /// Best-effort cancel, then mark the job Cancelled. Jobs already in a
    /// terminal status are left as they are.
    pub fn cancel(&self, ctx: &mut JobContext) -> Result<JobStatus, TrackError> {
        if ctx.job.is_terminal() {
            info!(job = %ctx.job.uuid, status = %ctx.job.status, "job already finished, not cancelling");
            return Ok(ctx.job.status);
        }

        let mut canceler = canceler_for(ctx, self.connector.clone())?;
        info!(job = %ctx.job.uuid, canceler = canceler.name(), "cancelling job");
        canceler.cancel();

        ctx.job.transition(JobStatus::Cancelled, "Job cancelled")?;
        Ok(ctx.job.status)
    }
}
