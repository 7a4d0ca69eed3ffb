//! Gateway Jobs - job lifecycle control plane
//!
//! Decides which job status changes are legal, observes jobs running on
//! remote execution hosts until they finish, and cancels them on request:
//! - `job_status`: the status state machine (re-exported)
//! - [`monitor`]: remote job monitors per runtime and scheduler
//! - [`cancel`]: best-effort cancelers per runtime and scheduler
//! - [`proctree`]: process listing correlation for Singularity jobs
//! - [`tracker`]: drives one job through its remote phases

pub mod cancel;
pub mod config;
pub mod dispatch;
pub mod logging;
pub mod mock;
pub mod model;
pub mod monitor;
pub mod proctree;
pub mod remote;
pub mod tracker;

pub use job_status::{self, can_transition, Fired, JobStatus, StatusMachine, Strictness, TransitionError};

pub use cancel::{canceler_for, CancelError, JobCanceler};
pub use config::{Config, ConfigError};
pub use dispatch::{DispatchError, StrategyKey};
pub use model::{JobContext, RemoteOutcome};
pub use monitor::{monitor_for, JobMonitor, MonitorError, MonitorPolicy, RemoteStatus};
pub use remote::{CommandOutput, Connector, ExecError, RemoteExecutor, SshConnector};
pub use tracker::{JobTracker, TrackError};
