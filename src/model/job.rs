//! Job record
//!
//! Status only changes through [`Job::transition`], which consults the
//! strict state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use job_status::{Fired, JobStatus, StatusMachine, TransitionError};

use super::JobType;

/// How the remote side of a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemoteOutcome {
    /// Process tree gone and the recorded exit code means success
    Finished,
    /// Process tree gone with a failing exit code or scheduler state
    Failed,
    /// The runtime reports completion itself; nothing was polled
    Delegated,
}

impl RemoteOutcome {
    /// Status the job should move to once its remote side has ended.
    pub fn next_status(&self) -> JobStatus {
        match self {
            RemoteOutcome::Finished | RemoteOutcome::Delegated => JobStatus::Archiving,
            RemoteOutcome::Failed => JobStatus::Failed,
        }
    }
}

/// Errors for job record operations
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Job {uuid}: {source}")]
    Transition {
        uuid: Uuid,
        #[source]
        source: TransitionError,
    },

    #[error("Failed to read job file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse job file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub uuid: Uuid,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tenant: String,

    #[serde(default)]
    pub owner: String,

    pub status: JobStatus,

    pub job_type: JobType,

    /// Remote pid (fork) or scheduler job id (batch); blank until assigned
    #[serde(default)]
    pub remote_job_id: Option<String>,

    pub exec_system_id: String,

    /// Output directory, relative to the system root dir unless absolute
    pub exec_system_output_dir: String,

    #[serde(default)]
    pub remote_outcome: Option<RemoteOutcome>,

    /// Exit code text reported by the remote side
    #[serde(default)]
    pub remote_result_info: Option<String>,

    #[serde(default)]
    pub last_message: Option<String>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Job {
    /// Create a new job in PENDING state
    pub fn new(
        job_type: JobType,
        exec_system_id: impl Into<String>,
        exec_system_output_dir: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            name: String::new(),
            tenant: String::new(),
            owner: String::new(),
            status: JobStatus::Pending,
            job_type,
            remote_job_id: None,
            exec_system_id: exec_system_id.into(),
            exec_system_output_dir: exec_system_output_dir.into(),
            remote_outcome: None,
            remote_result_info: None,
            last_message: None,
            created: now,
            last_updated: now,
        }
    }

    pub fn with_remote_id(mut self, remote_job_id: impl Into<String>) -> Self {
        self.remote_job_id = Some(remote_job_id.into());
        self
    }

    /// Remote id with surrounding whitespace removed, None if blank.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Move to `target`, validated by the strict state machine.
    pub fn transition(&mut self, target: JobStatus, message: impl Into<String>) -> Result<Fired, JobError> {
        let fired = StatusMachine::strict()
            .fire(&mut self.status, target)
            .map_err(|source| JobError::Transition {
                uuid: self.uuid,
                source,
            })?;

        if let Fired::Moved { .. } = fired {
            self.last_updated = Utc::now();
            self.last_message = Some(message.into());
        }

        Ok(fired)
    }

    pub fn record_remote_result(&mut self, outcome: RemoteOutcome, exit_code: Option<&str>) {
        self.remote_outcome = Some(outcome);
        self.remote_result_info = exit_code.map(str::to_string);
        self.last_updated = Utc::now();
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
