//! Polling policy for remote job monitors
//!
//! A policy is a list of steps, each giving a polling interval that applies
//! until a total elapsed time is reached, plus an overall cap on elapsed
//! time and optionally on the number of polls. Past the last step the last
//! interval keeps applying until a cap is hit.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// One policy step, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStep {
    pub interval_seconds: u64,
    pub until_seconds: u64,
}

/// Policy configuration (`[monitor]` table)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Maximum monitoring time per phase (default: 7 days)
    pub max_elapsed_seconds: u64,

    /// Maximum number of polls per phase (default: unlimited)
    pub max_attempts: Option<u32>,

    #[serde(rename = "step")]
    pub steps: Vec<PolicyStep>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_elapsed_seconds: 7 * 24 * 3600,
            max_attempts: None,
            steps: vec![
                PolicyStep { interval_seconds: 1, until_seconds: 60 },
                PolicyStep { interval_seconds: 10, until_seconds: 600 },
                PolicyStep { interval_seconds: 30, until_seconds: 3600 },
                PolicyStep { interval_seconds: 60, until_seconds: 86400 },
                PolicyStep { interval_seconds: 300, until_seconds: 7 * 24 * 3600 },
            ],
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        if self.max_elapsed_seconds == 0 {
            return Err(PolicyValidationError::ZeroMaxElapsed);
        }
        if self.max_attempts == Some(0) {
            return Err(PolicyValidationError::ZeroMaxAttempts);
        }
        if self.steps.is_empty() {
            return Err(PolicyValidationError::NoSteps);
        }

        let mut previous = 0;
        for (index, step) in self.steps.iter().enumerate() {
            if step.interval_seconds == 0 {
                return Err(PolicyValidationError::ZeroInterval { index });
            }
            if step.until_seconds <= previous {
                return Err(PolicyValidationError::StepsNotIncreasing {
                    index,
                    until: step.until_seconds,
                    previous,
                });
            }
            previous = step.until_seconds;
        }
        Ok(())
    }
}

/// Policy validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyValidationError {
    #[error("max_elapsed_seconds must be greater than 0")]
    ZeroMaxElapsed,

    #[error("max_attempts must be greater than 0 when set")]
    ZeroMaxAttempts,

    #[error("at least one [[monitor.step]] is required")]
    NoSteps,

    #[error("step {index}: interval_seconds must be greater than 0")]
    ZeroInterval { index: usize },

    #[error("step {index}: until_seconds must exceed {previous}, got {until}")]
    StepsNotIncreasing { index: usize, until: u64, previous: u64 },
}

/// Running policy state for one monitoring phase
#[derive(Debug, Clone)]
pub struct MonitorPolicy {
    steps: Vec<(Duration, Duration)>,
    max_elapsed: Duration,
    max_attempts: Option<u32>,
    started: Option<Instant>,
    attempts: u32,
}

impl MonitorPolicy {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            steps: config
                .steps
                .iter()
                .map(|s| {
                    (
                        Duration::from_secs(s.interval_seconds),
                        Duration::from_secs(s.until_seconds),
                    )
                })
                .collect(),
            max_elapsed: Duration::from_secs(config.max_elapsed_seconds),
            max_attempts: config.max_attempts,
            started: None,
            attempts: 0,
        }
    }

    /// Poll back to back, at most `max_attempts` times.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            steps: vec![(Duration::ZERO, Duration::MAX)],
            max_elapsed: Duration::MAX,
            max_attempts: Some(max_attempts),
            started: None,
            attempts: 0,
        }
    }

    /// Start a new phase: clock and attempt count go back to zero.
    pub fn restart(&mut self) {
        self.started = Some(Instant::now());
        self.attempts = 0;
    }

    /// Record a poll that did not settle the phase and return how long to
    /// wait before the next one, or None once the policy is exhausted.
    pub fn next_wait(&mut self) -> Option<Duration> {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.attempts += 1;

        if self.max_attempts.is_some_and(|max| self.attempts >= max) {
            return None;
        }

        let elapsed = started.elapsed();
        if elapsed >= self.max_elapsed {
            return None;
        }

        let interval = self
            .steps
            .iter()
            .find(|(_, until)| elapsed < *until)
            .or(self.steps.last())
            .map(|(interval, _)| *interval)?;

        Some(interval.min(self.max_elapsed - elapsed))
    }

    /// Polls recorded in the current phase.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}
