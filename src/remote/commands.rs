//! Remote command lines issued by monitors and cancelers.
//!
//! Only the trailing argument varies; the command text itself is fixed.

use uuid::Uuid;

use super::shell::quote;

/// Process listing correlated by the Singularity monitors.
pub const PS_COMMAND: &str = "ps --no-headers --sort=pid -eo pid,ppid,stat,euser,cmd";

/// Slurm accounting query prefix; the job id is appended.
pub const SACCT_COMMAND: &str =
    "sacct --noheader --parsable2 --allocations --format=JobID,State,ExitCode --jobs";

/// Remove a Docker container named after the job.
pub fn docker_remove(job_uuid: &Uuid) -> String {
    format!("docker rm -f {}", job_uuid)
}

/// Stop the Singularity instance named after the job.
pub fn singularity_instance_stop(job_uuid: &Uuid) -> String {
    format!("singularity instance stop {}", job_uuid)
}

/// Terminate a `singularity run` by its launching process id.
pub fn singularity_run_kill(remote_pid: &str) -> String {
    format!("kill -9 {}", quote(remote_pid))
}

pub fn slurm_cancel(remote_job_id: &str) -> String {
    format!("scancel {}", quote(remote_job_id))
}

pub fn slurm_accounting(remote_job_id: &str) -> String {
    format!("{} {}", SACCT_COMMAND, quote(remote_job_id))
}

pub fn cat(path: &str) -> String {
    format!("cat {}", quote(path))
}
