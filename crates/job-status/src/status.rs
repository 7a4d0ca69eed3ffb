//! The 13 job statuses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TransitionError;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Accepted, nothing done yet
    Pending,
    ProcessingInputs,
    StagingInputs,
    StagingJob,
    SubmittingJob,
    /// Waiting in a batch scheduler queue
    Queued,
    Running,
    Archiving,
    /// Held for operator intervention
    Blocked,
    Paused,
    Finished,
    Cancelled,
    Failed,
}

impl JobStatus {
    /// Every status, in declaration order.
    pub const ALL: [JobStatus; 13] = [
        JobStatus::Pending,
        JobStatus::ProcessingInputs,
        JobStatus::StagingInputs,
        JobStatus::StagingJob,
        JobStatus::SubmittingJob,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Archiving,
        JobStatus::Blocked,
        JobStatus::Paused,
        JobStatus::Finished,
        JobStatus::Cancelled,
        JobStatus::Failed,
    ];

    /// Terminal statuses accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Cancelled | JobStatus::Failed
        )
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    pub fn terminal_statuses() -> impl Iterator<Item = JobStatus> {
        Self::ALL.into_iter().filter(JobStatus::is_terminal)
    }

    pub fn active_statuses() -> impl Iterator<Item = JobStatus> {
        Self::ALL.into_iter().filter(JobStatus::is_active)
    }

    /// Canonical wire name, e.g. `PROCESSING_INPUTS`.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::ProcessingInputs => "PROCESSING_INPUTS",
            JobStatus::StagingInputs => "STAGING_INPUTS",
            JobStatus::StagingJob => "STAGING_JOB",
            JobStatus::SubmittingJob => "SUBMITTING_JOB",
            JobStatus::Queued => "QUEUED",
            JobStatus::Running => "RUNNING",
            JobStatus::Archiving => "ARCHIVING",
            JobStatus::Blocked => "BLOCKED",
            JobStatus::Paused => "PAUSED",
            JobStatus::Finished => "FINISHED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = TransitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TransitionError::UnknownStatus(s.to_string()))
    }
}
