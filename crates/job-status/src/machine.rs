//! Status state machine
//!
//! Each status declares the exact set of statuses reachable from it by one
//! event. An event names its target status. Re-asserting the current status
//! is a no-op for every non-terminal status; terminal statuses accept
//! nothing, not even themselves.

use crate::{JobStatus, TransitionError};

use JobStatus::*;

const FROM_PENDING: &[JobStatus] = &[ProcessingInputs, Blocked, Paused, Failed, Cancelled];
const FROM_PROCESSING_INPUTS: &[JobStatus] = &[StagingInputs, Blocked, Paused, Failed, Cancelled];
const FROM_STAGING_INPUTS: &[JobStatus] = &[StagingJob, Blocked, Paused, Failed, Cancelled];
const FROM_STAGING_JOB: &[JobStatus] = &[SubmittingJob, Blocked, Paused, Failed, Cancelled];
const FROM_SUBMITTING_JOB: &[JobStatus] = &[Queued, Running, Blocked, Paused, Failed, Cancelled];
const FROM_QUEUED: &[JobStatus] = &[Running, Blocked, Paused, Failed, Cancelled];
const FROM_RUNNING: &[JobStatus] = &[Archiving, Blocked, Paused, Failed, Cancelled];
const FROM_ARCHIVING: &[JobStatus] = &[Finished, Blocked, Paused, Failed, Cancelled];
const FROM_BLOCKED: &[JobStatus] = &[
    Pending,
    ProcessingInputs,
    StagingInputs,
    StagingJob,
    SubmittingJob,
    Queued,
    Running,
    Archiving,
    Paused,
    Failed,
    Cancelled,
    Finished,
];
const FROM_PAUSED: &[JobStatus] = &[
    Pending,
    ProcessingInputs,
    StagingInputs,
    StagingJob,
    SubmittingJob,
    Queued,
    Running,
    Archiving,
    Failed,
    Cancelled,
    Finished,
];
const TERMINAL: &[JobStatus] = &[];

/// Authored edges out of `from`, self-loop excluded.
pub fn legal_targets(from: JobStatus) -> &'static [JobStatus] {
    match from {
        Pending => FROM_PENDING,
        ProcessingInputs => FROM_PROCESSING_INPUTS,
        StagingInputs => FROM_STAGING_INPUTS,
        StagingJob => FROM_STAGING_JOB,
        SubmittingJob => FROM_SUBMITTING_JOB,
        Queued => FROM_QUEUED,
        Running => FROM_RUNNING,
        Archiving => FROM_ARCHIVING,
        Blocked => FROM_BLOCKED,
        Paused => FROM_PAUSED,
        Finished | Cancelled | Failed => TERMINAL,
    }
}

/// Is the event `to` legal while in `from`?
pub fn can_transition(from: JobStatus, to: JobStatus) -> bool {
    if from.is_terminal() {
        return false;
    }
    from == to || legal_targets(from).contains(&to)
}

/// Name-based predicate. Missing or unrecognized names are never legal.
pub fn can_transition_named(from: Option<&str>, to: Option<&str>) -> bool {
    let (Some(from), Some(to)) = (from, to) else {
        return false;
    };
    match (from.parse::<JobStatus>(), to.parse::<JobStatus>()) {
        (Ok(from), Ok(to)) => can_transition(from, to),
        _ => false,
    }
}

/// How the machine treats an event with no edge from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Undefined edges are reported as errors
    #[default]
    Strict,
    /// Undefined edges are ignored
    Lenient,
}

/// Result of firing an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    Moved { from: JobStatus, to: JobStatus },
    /// Self-event on a non-terminal status
    Unchanged,
    /// Undefined edge under lenient evaluation
    Ignored,
}

/// Evaluates events against the edge table. Holds no position of its own;
/// the caller owns the current status.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusMachine {
    strictness: Strictness,
}

impl StatusMachine {
    pub fn new(strictness: Strictness) -> Self {
        Self { strictness }
    }

    pub fn strict() -> Self {
        Self::new(Strictness::Strict)
    }

    pub fn lenient() -> Self {
        Self::new(Strictness::Lenient)
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Apply `event` to `current`.
    ///
    /// `current` is only written when the result is [`Fired::Moved`].
    pub fn fire(&self, current: &mut JobStatus, event: JobStatus) -> Result<Fired, TransitionError> {
        let from = *current;
        if !can_transition(from, event) {
            return match self.strictness {
                Strictness::Strict => Err(TransitionError::Undefined { from, to: event }),
                Strictness::Lenient => Ok(Fired::Ignored),
            };
        }

        if from == event {
            return Ok(Fired::Unchanged);
        }

        *current = event;
        Ok(Fired::Moved { from, to: event })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_path() {
        let machine = StatusMachine::strict();
        let mut status = Pending;
        for next in [
            ProcessingInputs,
            StagingInputs,
            StagingJob,
            SubmittingJob,
            Queued,
            Running,
            Archiving,
            Finished,
        ] {
            let fired = machine.fire(&mut status, next).unwrap();
            assert!(matches!(fired, Fired::Moved { to, .. } if to == next));
        }
        assert_eq!(status, Finished);
    }

    #[test]
    fn test_fork_skips_queue() {
        assert!(can_transition(SubmittingJob, Running));
        assert!(!can_transition(StagingJob, Running));
    }

    #[test]
    fn test_self_event_is_noop() {
        let machine = StatusMachine::strict();
        let mut status = Running;
        assert_eq!(machine.fire(&mut status, Running).unwrap(), Fired::Unchanged);
        assert_eq!(status, Running);
    }

    #[test]
    fn test_strict_undefined_edge() {
        let machine = StatusMachine::strict();
        let mut status = Pending;
        let err = machine.fire(&mut status, Running).unwrap_err();
        assert_eq!(err, TransitionError::Undefined { from: Pending, to: Running });
        assert_eq!(status, Pending);
    }

    #[test]
    fn test_lenient_undefined_edge() {
        let machine = StatusMachine::lenient();
        let mut status = Queued;
        assert_eq!(machine.fire(&mut status, Archiving).unwrap(), Fired::Ignored);
        assert_eq!(status, Queued);
    }

    #[test]
    fn test_terminal_rejects_self() {
        for terminal in [Finished, Cancelled, Failed] {
            assert!(!can_transition(terminal, terminal));
            let mut status = terminal;
            assert!(StatusMachine::strict().fire(&mut status, terminal).is_err());
            assert_eq!(status, terminal);
        }
    }

    #[test]
    fn test_blocked_can_finish_but_not_block() {
        assert!(can_transition(Blocked, Finished));
        assert!(can_transition(Blocked, Blocked));
        assert!(!legal_targets(Blocked).contains(&Blocked));
        assert!(!legal_targets(Paused).contains(&Blocked));
    }

    #[test]
    fn test_named_predicate() {
        assert!(can_transition_named(Some("QUEUED"), Some("RUNNING")));
        assert!(!can_transition_named(None, Some("RUNNING")));
        assert!(!can_transition_named(Some("QUEUED"), None));
        assert!(!can_transition_named(Some("QUEUED"), Some("DONE")));
    }
}
