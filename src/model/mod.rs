//! Job, application and execution-system descriptors
//!
//! These mirror the records owned by the persistence layer. The core only
//! reads them, apart from the job's status and remote result fields.

mod context;
mod job;

pub use context::{JobContext, JobTarget, EXIT_CODE_FILE_NAME};
pub use job::{Job, JobError, RemoteOutcome};

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the job reaches the execution host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    /// Launched directly on the host, tracked by process id
    Fork,
    /// Submitted to a batch scheduler, tracked by scheduler job id
    Batch,
}

/// Container runtime declared by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeType {
    Docker,
    Singularity,
}

/// Singularity launch style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SingularityMode {
    /// `singularity instance start`; the instance is named after the job uuid
    Start,
    /// `singularity run`; tracked by the launching process id
    Run,
}

/// Batch scheduler configured on an execution system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchedulerType {
    Slurm,
    Pbs,
    Lsf,
    Condor,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Fork => "FORK",
            JobType::Batch => "BATCH",
        }
    }
}

impl RuntimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "DOCKER",
            RuntimeType::Singularity => "SINGULARITY",
        }
    }
}

impl SingularityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SingularityMode::Start => "START",
            SingularityMode::Run => "RUN",
        }
    }
}

impl SchedulerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerType::Slurm => "SLURM",
            SchedulerType::Pbs => "PBS",
            SchedulerType::Lsf => "LSF",
            SchedulerType::Condor => "CONDOR",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })+
    };
}

display_as_str!(JobType, RuntimeType, SingularityMode, SchedulerType);

/// Resolved application descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub id: String,

    #[serde(default)]
    pub version: String,

    pub runtime: RuntimeType,

    /// Only meaningful for Singularity applications
    #[serde(default)]
    pub singularity_mode: Option<SingularityMode>,
}

/// Resolved execution-system descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecSystem {
    pub id: String,

    /// SSH hostname or IP address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Login user on the host; falls back to the configured SSH user
    #[serde(default)]
    pub effective_user: Option<String>,

    /// Root that relative job directories hang off
    #[serde(default)]
    pub root_dir: Option<String>,

    #[serde(default)]
    pub batch_scheduler: Option<SchedulerType>,
}

fn default_port() -> u16 {
    22
}
