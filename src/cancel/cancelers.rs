use std::sync::Arc;

use super::{run_cancel_command, CancelError, JobCanceler};
use crate::model::JobTarget;
use crate::remote::{commands, Connector};

fn require_remote_id(target: &JobTarget) -> Result<&str, CancelError> {
    target
        .remote_id
        .as_deref()
        .ok_or(CancelError::MissingRemoteId { job: target.uuid })
}

/// Removes the job's container, named after the job uuid.
pub struct DockerNativeCanceler {
    target: JobTarget,
    connector: Arc<dyn Connector>,
}

impl DockerNativeCanceler {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>) -> Self {
        Self { target, connector }
    }
}

impl JobCanceler for DockerNativeCanceler {
    fn name(&self) -> &'static str {
        "docker-native"
    }

    fn try_cancel(&mut self) -> Result<(), CancelError> {
        let command = commands::docker_remove(&self.target.uuid);
        run_cancel_command(&self.target, self.connector.as_ref(), &command)
    }
}

/// Stops the Singularity instance named after the job uuid.
pub struct SingularityStartCanceler {
    target: JobTarget,
    connector: Arc<dyn Connector>,
}

impl SingularityStartCanceler {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>) -> Self {
        Self { target, connector }
    }
}

impl JobCanceler for SingularityStartCanceler {
    fn name(&self) -> &'static str {
        "singularity-start"
    }

    fn try_cancel(&mut self) -> Result<(), CancelError> {
        let command = commands::singularity_instance_stop(&self.target.uuid);
        run_cancel_command(&self.target, self.connector.as_ref(), &command)
    }
}

/// Kills the process a `singularity run` job was launched as.
pub struct SingularityRunCanceler {
    target: JobTarget,
    connector: Arc<dyn Connector>,
}

impl SingularityRunCanceler {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>) -> Self {
        Self { target, connector }
    }
}

impl JobCanceler for SingularityRunCanceler {
    fn name(&self) -> &'static str {
        "singularity-run"
    }

    fn try_cancel(&mut self) -> Result<(), CancelError> {
        let command = commands::singularity_run_kill(require_remote_id(&self.target)?);
        run_cancel_command(&self.target, self.connector.as_ref(), &command)
    }
}

/// Cancels the job's Slurm allocation.
pub struct SlurmCanceler {
    target: JobTarget,
    connector: Arc<dyn Connector>,
}

impl SlurmCanceler {
    pub fn new(target: JobTarget, connector: Arc<dyn Connector>) -> Self {
        Self { target, connector }
    }
}

impl JobCanceler for SlurmCanceler {
    fn name(&self) -> &'static str {
        "slurm"
    }

    fn try_cancel(&mut self) -> Result<(), CancelError> {
        let command = commands::slurm_cancel(require_remote_id(&self.target)?);
        run_cancel_command(&self.target, self.connector.as_ref(), &command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FailureConfig, MockConnector, MockHost};
    use crate::model::ExecSystem;
    use uuid::Uuid;

    fn target(remote_id: Option<&str>) -> JobTarget {
        JobTarget {
            uuid: Uuid::parse_str("5b3c8d0e-8f5a-4c39-9d57-3f4c1b0e2a11").unwrap(),
            remote_id: remote_id.map(str::to_string),
            system: ExecSystem {
                id: "sys".to_string(),
                host: "host".to_string(),
                port: 22,
                effective_user: None,
                root_dir: None,
                batch_scheduler: None,
            },
            exit_code_file: "/out/tapisjob.exitcode".to_string(),
        }
    }

    #[test]
    fn test_commands_issued() {
        let host = MockHost::new();
        let connector: Arc<dyn Connector> = Arc::new(MockConnector::new(host.clone()));

        DockerNativeCanceler::new(target(None), connector.clone()).try_cancel().unwrap();
        SingularityStartCanceler::new(target(None), connector.clone()).try_cancel().unwrap();
        SingularityRunCanceler::new(target(Some("624785")), connector.clone()).try_cancel().unwrap();
        SlurmCanceler::new(target(Some("1001")), connector).try_cancel().unwrap();

        assert_eq!(
            host.commands(),
            vec![
                "docker rm -f 5b3c8d0e-8f5a-4c39-9d57-3f4c1b0e2a11".to_string(),
                "singularity instance stop 5b3c8d0e-8f5a-4c39-9d57-3f4c1b0e2a11".to_string(),
                "kill -9 624785".to_string(),
                "scancel 1001".to_string(),
            ]
        );
        assert_eq!(host.opened(), 4);
    }

    #[test]
    fn test_missing_remote_id() {
        let host = MockHost::new();
        let connector: Arc<dyn Connector> = Arc::new(MockConnector::new(host.clone()));

        let err = SlurmCanceler::new(target(None), connector).try_cancel().unwrap_err();
        assert!(matches!(err, CancelError::MissingRemoteId { .. }));
        assert!(host.commands().is_empty());
    }

    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let host = MockHost::new();
        host.respond("docker rm", "Error: No such container", 1);
        let connector: Arc<dyn Connector> = Arc::new(MockConnector::new(host));

        assert!(DockerNativeCanceler::new(target(None), connector).try_cancel().is_ok());
    }

    #[test]
    fn test_exec_failure_surfaces_from_try_cancel_only() {
        let host = MockHost::new();
        host.inject_failure_all(FailureConfig::connection_lost());
        let connector: Arc<dyn Connector> = Arc::new(MockConnector::new(host));

        let mut canceler = SingularityStartCanceler::new(target(None), connector);
        assert!(matches!(canceler.try_cancel(), Err(CancelError::Exec { .. })));
        canceler.cancel();
    }
}
