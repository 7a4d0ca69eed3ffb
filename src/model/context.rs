//! Job execution context
//!
//! Bundles a job with its resolved application and execution system and
//! resolves the remote paths the monitors need.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AppDescriptor, ExecSystem, Job, JobError, JobType, RuntimeType, SchedulerType};

/// File the job wrapper script writes its application's exit code to,
/// inside the job output directory.
pub const EXIT_CODE_FILE_NAME: &str = "tapisjob.exitcode";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContext {
    pub job: Job,
    pub app: AppDescriptor,
    pub system: ExecSystem,
}

impl JobContext {
    pub fn new(job: Job, app: AppDescriptor, system: ExecSystem) -> Self {
        Self { job, app, system }
    }

    /// Load a job file (TOML with `[job]`, `[app]` and `[system]` tables).
    pub fn load(path: &Path) -> Result<Self, JobError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, JobError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn job_type(&self) -> JobType {
        self.job.job_type
    }

    pub fn runtime(&self) -> RuntimeType {
        self.app.runtime
    }

    pub fn scheduler(&self) -> Option<SchedulerType> {
        self.system.batch_scheduler
    }

    /// Absolute job output directory on the execution host.
    pub fn output_dir(&self) -> String {
        let dir = self.job.exec_system_output_dir.trim();
        if dir.starts_with('/') {
            return dir.to_string();
        }

        match self
            .system
            .root_dir
            .as_deref()
            .map(str::trim)
            .filter(|root| !root.is_empty())
        {
            Some(root) => join_remote(root, dir),
            None => format!("/{}", dir),
        }
    }

    /// Path of the optional exit-code file written by the wrapper script.
    pub fn exit_code_file(&self) -> String {
        join_remote(&self.output_dir(), EXIT_CODE_FILE_NAME)
    }

    /// Snapshot of what a monitor or canceler needs, detached from the
    /// job record so the record can keep changing underneath.
    pub fn target(&self) -> JobTarget {
        JobTarget {
            uuid: self.job.uuid,
            remote_id: self.job.remote_id().map(str::to_string),
            system: self.system.clone(),
            exit_code_file: self.exit_code_file(),
        }
    }
}

/// Remote coordinates of one job.
#[derive(Debug, Clone)]
pub struct JobTarget {
    pub uuid: Uuid,
    /// Non-blank remote id, if assigned
    pub remote_id: Option<String>,
    pub system: ExecSystem,
    pub exit_code_file: String,
}

fn join_remote(base: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return base.to_string();
    }
    format!("{}/{}", base.trim_end_matches('/'), rel)
}
