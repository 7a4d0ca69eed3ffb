//! Policy-driven poll loop

use std::thread;

use tracing::{debug, trace};
use uuid::Uuid;

use super::policy::MonitorPolicy;
use super::MonitorError;

/// Outcome of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Not settled yet; wait and poll again
    Pending,
    /// The query returned nothing at all
    Empty,
    /// Settled
    Ready(T),
}

/// Poll `step` until it settles, sleeping between polls as the policy says.
///
/// An empty result ends the loop with [`MonitorError::EmptyResult`] unless
/// `allow_empty` is set, in which case it counts as pending. Errors from
/// `step` end the loop immediately.
pub fn poll_until<T>(
    job: Uuid,
    policy: &mut MonitorPolicy,
    allow_empty: bool,
    mut step: impl FnMut() -> Result<PollStep<T>, MonitorError>,
) -> Result<T, MonitorError> {
    policy.restart();
    loop {
        match step()? {
            PollStep::Ready(value) => return Ok(value),
            PollStep::Empty if !allow_empty => return Err(MonitorError::EmptyResult { job }),
            PollStep::Empty | PollStep::Pending => {}
        }

        match policy.next_wait() {
            Some(wait) => {
                trace!(%job, attempt = policy.attempts(), ?wait, "job not settled, waiting");
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }
            None => {
                debug!(%job, attempts = policy.attempts(), "monitoring policy exhausted");
                return Err(MonitorError::PolicyExhausted {
                    job,
                    attempts: policy.attempts(),
                    elapsed_seconds: policy.elapsed().as_secs(),
                });
            }
        }
    }
}
