// pipewright/src/pipeline/options.rs

//! Per-run configuration: error strategy and per-step retry overrides.

use crate::error::PipewrightError;
use crate::retry::{RetryOverride, RetryPolicy};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// What the orchestrator does when a step fails or its output is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorStrategy {
  /// Halt on the first failure and report it.
  FailFast,
  /// Record the failure as error entries and continue with whatever is still valid.
  #[default]
  CollectErrors,
}

impl ErrorStrategy {
  pub fn as_str(self) -> &'static str {
    match self {
      ErrorStrategy::FailFast => "fail_fast",
      ErrorStrategy::CollectErrors => "collect_errors",
    }
  }
}

impl fmt::Display for ErrorStrategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ErrorStrategy {
  type Err = PipewrightError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim() {
      "fail_fast" => Ok(ErrorStrategy::FailFast),
      "collect_errors" => Ok(ErrorStrategy::CollectErrors),
      other => Err(PipewrightError::UnknownStrategy {
        value: other.to_string(),
      }),
    }
  }
}

/// Options for a single [`Pipeline::run`](crate::Pipeline::run).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
  pub error_strategy: ErrorStrategy,
  retry_overrides: BTreeMap<String, RetryOverride>,
}

impl RunOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_fast() -> Self {
    Self::new().error_strategy(ErrorStrategy::FailFast)
  }

  pub fn collect_errors() -> Self {
    Self::new().error_strategy(ErrorStrategy::CollectErrors)
  }

  #[must_use]
  pub fn error_strategy(mut self, strategy: ErrorStrategy) -> Self {
    self.error_strategy = strategy;
    self
  }

  /// Overrides the retry policy of `step` for this run only. A later call for the same
  /// step replaces the earlier one.
  #[must_use]
  pub fn retry(mut self, step: impl Into<String>, overrides: RetryOverride) -> Self {
    self.retry_overrides.insert(step.into(), overrides);
    self
  }

  pub fn retry_override(&self, step: &str) -> Option<&RetryOverride> {
    self.retry_overrides.get(step)
  }

  /// The policy `step` runs under: `defaults` with this run's override applied.
  pub fn policy_for(&self, step: &str, defaults: &RetryPolicy) -> RetryPolicy {
    match self.retry_overrides.get(step) {
      Some(overrides) => defaults.merged(overrides),
      None => *defaults,
    }
  }

  /// Overridden step names, in sorted order.
  pub(crate) fn overridden_steps(&self) -> impl Iterator<Item = &str> {
    self.retry_overrides.keys().map(String::as_str)
  }
}
