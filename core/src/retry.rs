// pipewright/src/retry.rs

//! Bounded retry with exponential backoff.
//!
//! The executor is blind to *why* an attempt failed: every `Err` is retried until the
//! attempt cap is reached, and the last error is returned unchanged. Backoff sleeps block
//! the calling thread.

use crate::observer::{EventSink, TRACING_SINK};
use std::fmt::Display;
use std::time::Duration;
use tracing::Level;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

/// Attempt cap plus initial/maximum delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Zero is treated as one.
  pub max_attempts: u32,
  pub initial_delay: Duration,
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      initial_delay: DEFAULT_INITIAL_DELAY,
      max_delay: DEFAULT_MAX_DELAY,
    }
  }
}

impl RetryPolicy {
  pub fn new() -> Self {
    Self::default()
  }

  /// A single attempt, no retries.
  pub fn no_retry() -> Self {
    Self::default().with_max_attempts(1)
  }

  #[must_use]
  pub fn with_max_attempts(mut self, attempts: u32) -> Self {
    self.max_attempts = attempts;
    self
  }

  #[must_use]
  pub fn with_initial_delay(mut self, delay: Duration) -> Self {
    self.initial_delay = delay;
    self
  }

  #[must_use]
  pub fn with_max_delay(mut self, delay: Duration) -> Self {
    self.max_delay = delay;
    self
  }

  /// Returns this policy with every field set in `overrides` replaced.
  #[must_use]
  pub fn merged(mut self, overrides: &RetryOverride) -> Self {
    if let Some(attempts) = overrides.max_attempts {
      self.max_attempts = attempts;
    }
    if let Some(delay) = overrides.initial_delay {
      self.initial_delay = delay;
    }
    if let Some(delay) = overrides.max_delay {
      self.max_delay = delay;
    }
    self
  }

  pub(crate) fn attempt_cap(&self) -> u32 {
    self.max_attempts.max(1)
  }

  /// Delay slept after failed attempt `attempt` (1-based):
  /// `min(initial_delay * 2^(attempt - 1), max_delay)`.
  pub fn delay_before(&self, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    self.initial_delay.saturating_mul(factor).min(self.max_delay)
  }
}

/// Per-step, per-run partial override of a [`RetryPolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryOverride {
  pub max_attempts: Option<u32>,
  pub initial_delay: Option<Duration>,
  pub max_delay: Option<Duration>,
}

impl RetryOverride {
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn max_attempts(mut self, attempts: u32) -> Self {
    self.max_attempts = Some(attempts);
    self
  }

  #[must_use]
  pub fn initial_delay(mut self, delay: Duration) -> Self {
    self.initial_delay = Some(delay);
    self
  }

  #[must_use]
  pub fn max_delay(mut self, delay: Duration) -> Self {
    self.max_delay = Some(delay);
    self
  }
}

/// Blocks the caller between attempts.
pub trait Sleeper: Send + Sync {
  fn sleep(&self, delay: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

pub(crate) static THREAD_SLEEPER: ThreadSleeper = ThreadSleeper;

impl Sleeper for ThreadSleeper {
  fn sleep(&self, delay: Duration) {
    std::thread::sleep(delay);
  }
}

/// Runs a fallible operation under a [`RetryPolicy`].
pub struct RetryExecutor<'a> {
  policy: RetryPolicy,
  label: &'a str,
  sink: &'a dyn EventSink,
  sleeper: &'a dyn Sleeper,
}

impl<'a> RetryExecutor<'a> {
  pub fn new(policy: &RetryPolicy) -> Self {
    Self {
      policy: *policy,
      label: "operation",
      sink: &TRACING_SINK,
      sleeper: &THREAD_SLEEPER,
    }
  }

  /// Name reported in retry events (the step name, when run by a pipeline).
  #[must_use]
  pub fn label(mut self, label: &'a str) -> Self {
    self.label = label;
    self
  }

  #[must_use]
  pub fn event_sink(mut self, sink: &'a dyn EventSink) -> Self {
    self.sink = sink;
    self
  }

  #[must_use]
  pub fn sleeper(mut self, sleeper: &'a dyn Sleeper) -> Self {
    self.sleeper = sleeper;
    self
  }

  /// Invokes `operation` until it succeeds or the attempt cap is reached.
  pub fn run<T, E, F>(&self, mut operation: F) -> Result<T, E>
  where
    F: FnMut() -> Result<T, E>,
    E: Display,
  {
    let max_attempts = self.policy.attempt_cap();
    let mut attempt = 1;
    let mut delay = self.policy.initial_delay.min(self.policy.max_delay);

    loop {
      match operation() {
        Ok(value) => return Ok(value),
        Err(err) if attempt < max_attempts => {
          self.sink.emit(
            Level::WARN,
            "Attempt failed, retrying",
            &[
              ("step", self.label.to_string()),
              ("attempt", attempt.to_string()),
              ("max_attempts", max_attempts.to_string()),
              ("delay_ms", delay.as_millis().to_string()),
              ("error", err.to_string()),
            ],
          );
          self.sleeper.sleep(delay);
          delay = delay.saturating_mul(2).min(self.policy.max_delay);
          attempt += 1;
        }
        Err(err) => {
          self.sink.emit(
            Level::ERROR,
            "Retries exhausted",
            &[
              ("step", self.label.to_string()),
              ("attempts", attempt.to_string()),
              ("error", err.to_string()),
            ],
          );
          return Err(err);
        }
      }
    }
  }
}

/// Runs `operation` under `policy`, logging through `tracing` and sleeping the current
/// thread between attempts.
pub fn retry_with_backoff<T, E, F>(operation: F, policy: &RetryPolicy) -> Result<T, E>
where
  F: FnMut() -> Result<T, E>,
  E: Display,
{
  RetryExecutor::new(policy).run(operation)
}
