//! Shared builders for the integration tests
//!
//! Job contexts for each supported combination, process listings shaped
//! like `ps --no-headers -eo pid,ppid,stat,euser,cmd` output, and a mock
//! host wired into a connector.

#![allow(dead_code)]

use std::sync::Arc;

use gateway_jobs::mock::{MockConnector, MockHost};
use gateway_jobs::model::{
    AppDescriptor, ExecSystem, Job, JobContext, JobType, RuntimeType, SchedulerType, SingularityMode,
};
use gateway_jobs::{Connector, JobStatus};
use uuid::Uuid;

pub const JOB_UUID: &str = "5b3c8d0e-8f5a-4c39-9d57-3f4c1b0e2a11";
pub const EXIT_CODE_FILE: &str = "/scratch/jobs/out/tapisjob.exitcode";

pub fn job_uuid() -> Uuid {
    Uuid::parse_str(JOB_UUID).unwrap()
}

pub fn context(
    job_type: JobType,
    runtime: RuntimeType,
    mode: Option<SingularityMode>,
    scheduler: Option<SchedulerType>,
    remote_id: Option<&str>,
) -> JobContext {
    let mut job = Job::new(job_type, "stampede", "jobs/out");
    job.uuid = job_uuid();
    job.status = JobStatus::SubmittingJob;
    job.remote_job_id = remote_id.map(str::to_string);

    JobContext::new(
        job,
        AppDescriptor {
            id: "sleeper".to_string(),
            version: "0.1".to_string(),
            runtime,
            singularity_mode: mode,
        },
        ExecSystem {
            id: "stampede".to_string(),
            host: "stampede.example.org".to_string(),
            port: 22,
            effective_user: None,
            root_dir: Some("/scratch".to_string()),
            batch_scheduler: scheduler,
        },
    )
}

pub fn singularity_start(remote_id: Option<&str>) -> JobContext {
    context(
        JobType::Fork,
        RuntimeType::Singularity,
        Some(SingularityMode::Start),
        None,
        remote_id,
    )
}

pub fn singularity_run(remote_id: Option<&str>) -> JobContext {
    context(
        JobType::Fork,
        RuntimeType::Singularity,
        Some(SingularityMode::Run),
        None,
        remote_id,
    )
}

pub fn docker_fork() -> JobContext {
    context(JobType::Fork, RuntimeType::Docker, None, None, Some("c0ffee"))
}

pub fn docker_slurm(remote_id: Option<&str>) -> JobContext {
    context(
        JobType::Batch,
        RuntimeType::Docker,
        None,
        Some(SchedulerType::Slurm),
        remote_id,
    )
}

pub fn singularity_slurm(remote_id: Option<&str>) -> JobContext {
    context(
        JobType::Batch,
        RuntimeType::Singularity,
        None,
        Some(SchedulerType::Slurm),
        remote_id,
    )
}

pub fn connector(host: &MockHost) -> Arc<dyn Connector> {
    Arc::new(MockConnector::new(host.clone()))
}

/// Running `singularity instance start` job; sinit is 624785.
pub fn instance_listing() -> String {
    format!(
        "    1       0 Ss   root     /sbin/init\n\
         624784    2286 Ssl  rcardone Singularity instance: rcardone [{uuid}]\n\
         624785  624784 Sl   rcardone sinit\n\
         624807  624785 S    rcardone /bin/sh /.singularity.d/startscript\n\
         624810  624807 Sl   rcardone app",
        uuid = JOB_UUID
    )
}

/// Same instance after the startscript has exited.
pub fn instance_listing_finished() -> String {
    format!(
        "    1       0 Ss   root     /sbin/init\n\
         624784    2286 Ssl  rcardone Singularity instance: rcardone [{uuid}]\n\
         624785  624784 Sl   rcardone sinit",
        uuid = JOB_UUID
    )
}

/// Instance whose startscript has exited while its application lingers.
pub fn instance_listing_orphaned_app() -> String {
    format!(
        "    1       0 Ss   root     /sbin/init\n\
         624784    2286 Ssl  rcardone Singularity instance: rcardone [{uuid}]\n\
         624785  624784 Sl   rcardone sinit\n\
         624810  624807 Sl   rcardone app",
        uuid = JOB_UUID
    )
}

/// Running `singularity run` job; the launching process is 4100.
pub const RUN_LISTING: &str = "4000     1 Ss   u bash\n\
4100  4000 S    u /usr/local/bin/singularity run sleeper.sif\n\
4200  4100 S    u /bin/sh /.singularity.d/runscript\n\
4300  4200 R    u python app.py";

/// The run job's launcher lingering after its runscript exited.
pub const RUN_LISTING_LINGERING: &str = "4000     1 Ss   u bash\n\
4100  4000 S    u /usr/local/bin/singularity run sleeper.sif";

/// Neither run job process remains.
pub const RUN_LISTING_GONE: &str = "4000     1 Ss   u bash";
