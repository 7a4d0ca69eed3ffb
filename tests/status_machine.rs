//! Status state machine tests
//!
//! Exercises the edge table as a whole: every (from, to) pair, terminal
//! behaviour, strict and lenient evaluation, and name-based lookups.

use gateway_jobs::job_status::{can_transition_named, legal_targets};
use gateway_jobs::{can_transition, Fired, JobStatus, StatusMachine, TransitionError};

// =============================================================================
// Test 1: The predicate agrees with the edge table for every pair
// =============================================================================

#[test]
fn test_every_pair_matches_table() {
    for from in JobStatus::ALL {
        for to in JobStatus::ALL {
            let expected = if from.is_terminal() {
                false
            } else {
                from == to || legal_targets(from).contains(&to)
            };
            assert_eq!(
                can_transition(from, to),
                expected,
                "can_transition({}, {}) disagrees with the table",
                from,
                to
            );
        }
    }
}

#[test]
fn test_tables_never_list_self() {
    for from in JobStatus::ALL {
        assert!(
            !legal_targets(from).contains(&from),
            "{} lists itself as a target",
            from
        );
    }
}

// =============================================================================
// Test 2: Terminal statuses accept nothing
// =============================================================================

#[test]
fn test_terminal_rejects_everything() {
    let machine = StatusMachine::strict();
    for from in JobStatus::terminal_statuses() {
        for to in JobStatus::ALL {
            let mut status = from;
            let err = machine.fire(&mut status, to).unwrap_err();
            assert_eq!(err, TransitionError::Undefined { from, to });
            assert_eq!(status, from, "terminal status must not move");
        }
    }
}

#[test]
fn test_every_active_status_can_fail_and_cancel() {
    for from in JobStatus::active_statuses() {
        assert!(can_transition(from, JobStatus::Failed), "{} -> FAILED", from);
        assert!(can_transition(from, JobStatus::Cancelled), "{} -> CANCELLED", from);
        assert!(can_transition(from, JobStatus::Paused) || from == JobStatus::Paused);
    }
}

// =============================================================================
// Test 3: Strict and lenient evaluation
// =============================================================================

#[test]
fn test_strict_leaves_status_on_error() {
    let machine = StatusMachine::strict();
    let mut status = JobStatus::Queued;

    assert!(machine.fire(&mut status, JobStatus::Archiving).is_err());
    assert_eq!(status, JobStatus::Queued);
}

#[test]
fn test_lenient_ignores_undefined_edges() {
    let machine = StatusMachine::lenient();
    let mut status = JobStatus::Queued;

    assert_eq!(machine.fire(&mut status, JobStatus::Archiving).unwrap(), Fired::Ignored);
    assert_eq!(status, JobStatus::Queued);

    let mut done = JobStatus::Finished;
    assert_eq!(machine.fire(&mut done, JobStatus::Finished).unwrap(), Fired::Ignored);
    assert_eq!(done, JobStatus::Finished);
}

#[test]
fn test_paused_resumes_anywhere_but_blocked() {
    let machine = StatusMachine::strict();
    let mut status = JobStatus::Running;

    machine.fire(&mut status, JobStatus::Paused).unwrap();
    assert!(!can_transition(JobStatus::Paused, JobStatus::Blocked));

    let fired = machine.fire(&mut status, JobStatus::Running).unwrap();
    assert_eq!(
        fired,
        Fired::Moved {
            from: JobStatus::Paused,
            to: JobStatus::Running
        }
    );
}

#[test]
fn test_blocked_can_finish_directly() {
    assert!(can_transition(JobStatus::Blocked, JobStatus::Finished));
    assert!(can_transition(JobStatus::Blocked, JobStatus::Pending));
}

// =============================================================================
// Test 4: Name-based lookups
// =============================================================================

#[test]
fn test_named_transitions() {
    assert!(can_transition_named(Some("RUNNING"), Some("ARCHIVING")));
    assert!(can_transition_named(Some("QUEUED"), Some("QUEUED")));
    assert!(!can_transition_named(Some("RUNNING"), Some("QUEUED")));
    assert!(!can_transition_named(Some("FINISHED"), Some("FINISHED")));
}

#[test]
fn test_named_missing_or_unknown() {
    assert!(!can_transition_named(None, Some("RUNNING")));
    assert!(!can_transition_named(Some("RUNNING"), None));
    assert!(!can_transition_named(Some("SLEEPING"), Some("RUNNING")));

    let err = "SLEEPING".parse::<JobStatus>().unwrap_err();
    assert_eq!(err, TransitionError::UnknownStatus("SLEEPING".to_string()));
}
