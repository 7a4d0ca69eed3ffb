use tracing::debug;

use super::{JobMonitor, MonitorError, RemoteOutcome};
use crate::model::JobTarget;

/// Monitor for directly launched Docker containers.
///
/// Completion of these jobs is observed outside this component, so the
/// running phase returns at once with [`RemoteOutcome::Delegated`].
#[derive(Debug)]
pub struct DockerNativeMonitor {
    target: JobTarget,
}

impl DockerNativeMonitor {
    pub fn new(target: JobTarget) -> Self {
        Self { target }
    }
}

impl JobMonitor for DockerNativeMonitor {
    fn name(&self) -> &'static str {
        "docker-native"
    }

    fn monitor_running_job(&mut self) -> Result<RemoteOutcome, MonitorError> {
        debug!(job = %self.target.uuid, "docker container completion is tracked elsewhere");
        Ok(RemoteOutcome::Delegated)
    }

    fn exit_code(&self) -> Option<&str> {
        None
    }
}
