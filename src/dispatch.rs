//! Strategy dispatch
//!
//! Monitors and cancelers are chosen by the job's (job type, runtime,
//! scheduler) combination. Unknown combinations are configuration errors,
//! raised with enough detail to diagnose; a strategy is never silently
//! absent.

use std::fmt;

use uuid::Uuid;

use crate::model::{JobContext, JobType, RuntimeType, SchedulerType, SingularityMode};

/// Dispatch key resolved from a job context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyKey {
    pub job: Uuid,
    pub job_type: JobType,
    pub runtime: RuntimeType,
    /// Set for Singularity applications that declare a launch style
    pub mode: Option<SingularityMode>,
    /// Set for batch jobs
    pub scheduler: Option<SchedulerType>,
}

impl StrategyKey {
    pub fn resolve(ctx: &JobContext) -> Result<Self, DispatchError> {
        let job = ctx.job.uuid;
        let job_type = ctx.job_type();
        let runtime = ctx.runtime();

        let scheduler = match job_type {
            JobType::Fork => None,
            JobType::Batch => Some(ctx.scheduler().ok_or_else(|| DispatchError::MissingScheduler {
                job,
                system: ctx.system.id.clone(),
            })?),
        };

        let mode = match runtime {
            RuntimeType::Docker => None,
            RuntimeType::Singularity => ctx.app.singularity_mode,
        };
        if job_type == JobType::Fork && runtime == RuntimeType::Singularity && mode.is_none() {
            return Err(DispatchError::MissingSingularityMode {
                job,
                app: ctx.app.id.clone(),
            });
        }

        Ok(Self {
            job,
            job_type,
            runtime,
            mode,
            scheduler,
        })
    }
}

impl fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {} (type {}, runtime {}", self.job, self.job_type, self.runtime)?;
        if let Some(mode) = self.mode {
            write!(f, " {}", mode)?;
        }
        match self.scheduler {
            Some(scheduler) => write!(f, ", scheduler {})", scheduler),
            None => write!(f, ", no scheduler)"),
        }
    }
}

/// Strategy selection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Unsupported {component} combination for {key}")]
    Unsupported { component: &'static str, key: StrategyKey },

    #[error("{component} not implemented for {key}")]
    NotImplemented { component: &'static str, key: StrategyKey },

    #[error("Job {job}: batch execution system '{system}' has no scheduler assigned")]
    MissingScheduler { job: Uuid, system: String },

    #[error("Job {job}: Singularity application '{app}' declares neither start nor run mode")]
    MissingSingularityMode { job: Uuid, app: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppDescriptor, ExecSystem, Job};

    fn context(
        job_type: JobType,
        runtime: RuntimeType,
        mode: Option<SingularityMode>,
        scheduler: Option<SchedulerType>,
    ) -> JobContext {
        JobContext::new(
            Job::new(job_type, "sys", "/out"),
            AppDescriptor {
                id: "app".to_string(),
                version: "1".to_string(),
                runtime,
                singularity_mode: mode,
            },
            ExecSystem {
                id: "sys".to_string(),
                host: "host".to_string(),
                port: 22,
                effective_user: None,
                root_dir: None,
                batch_scheduler: scheduler,
            },
        )
    }

    #[test]
    fn test_fork_ignores_scheduler() {
        let ctx = context(JobType::Fork, RuntimeType::Docker, None, Some(SchedulerType::Slurm));
        let key = StrategyKey::resolve(&ctx).unwrap();
        assert_eq!(key.scheduler, None);
    }

    #[test]
    fn test_batch_requires_scheduler() {
        let ctx = context(JobType::Batch, RuntimeType::Docker, None, None);
        let err = StrategyKey::resolve(&ctx).unwrap_err();
        assert!(matches!(err, DispatchError::MissingScheduler { ref system, .. } if system == "sys"));
    }

    #[test]
    fn test_fork_singularity_requires_mode() {
        let ctx = context(JobType::Fork, RuntimeType::Singularity, None, None);
        let err = StrategyKey::resolve(&ctx).unwrap_err();
        assert!(matches!(err, DispatchError::MissingSingularityMode { .. }));
    }

    #[test]
    fn test_docker_drops_mode() {
        let ctx = context(JobType::Fork, RuntimeType::Docker, Some(SingularityMode::Run), None);
        assert_eq!(StrategyKey::resolve(&ctx).unwrap().mode, None);
    }

    #[test]
    fn test_error_names_everything() {
        let ctx = context(
            JobType::Batch,
            RuntimeType::Singularity,
            Some(SingularityMode::Run),
            Some(SchedulerType::Pbs),
        );
        let key = StrategyKey::resolve(&ctx).unwrap();
        let message = DispatchError::Unsupported { component: "monitor", key }.to_string();
        assert!(message.contains(&ctx.job.uuid.to_string()));
        assert!(message.contains("BATCH"));
        assert!(message.contains("SINGULARITY"));
        assert!(message.contains("PBS"));
    }
}
