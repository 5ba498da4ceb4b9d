// pipewright/src/core/outcome.rs

//! Shapes produced by validators and by a pipeline run: invalid items, normalized error
//! entries, per-step metrics, and the final tagged outcome.

use super::value::Value;
use std::time::Duration;

/// Reason recorded for an invalid item that did not carry one of its own.
pub const DEFAULT_INVALID_REASON: &str = "Invalid";

/// One rejected item from a validator, optionally paired with an explicit reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Invalid {
  pub record: Value,
  pub reason: Option<String>,
}

impl Invalid {
  pub fn new(record: impl Into<Value>) -> Self {
    Invalid::from(record.into())
  }

  pub fn with_reason(record: impl Into<Value>, reason: impl Into<String>) -> Self {
    Self {
      record: record.into(),
      reason: Some(reason.into()),
    }
  }

  /// The explicit reason, or [`DEFAULT_INVALID_REASON`].
  pub fn reason(&self) -> &str {
    self.reason.as_deref().unwrap_or(DEFAULT_INVALID_REASON)
  }
}

/// A `(record, "reason")` tuple keeps its reason; any other value is the record itself.
impl From<Value> for Invalid {
  fn from(value: Value) -> Self {
    match value {
      Value::Tuple(mut pair) if pair.len() == 2 && matches!(pair[1], Value::String(_)) => {
        let reason = match pair.pop() {
          Some(Value::String(reason)) => Some(reason),
          _ => None,
        };
        let record = pair.pop().unwrap_or_default();
        Self { record, reason }
      }
      record => Self { record, reason: None },
    }
  }
}

impl<S: Into<String>> From<(Value, S)> for Invalid {
  fn from((record, reason): (Value, S)) -> Self {
    Self::with_reason(record, reason)
  }
}

/// Result of a step validator.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
  /// Everything passed; continue with this value.
  Valid(Value),
  /// Some items were rejected; `valid` is what the pipeline may continue with.
  Partitioned { invalid: Vec<Invalid>, valid: Value },
}

impl ValidationOutcome {
  pub fn is_valid(&self) -> bool {
    matches!(self, ValidationOutcome::Valid(_))
  }
}

/// Normalized failure accumulated under the `collect_errors` strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
  pub step: String,
  pub record: Value,
  pub reason: String,
}

impl ErrorEntry {
  pub fn new(step: impl Into<String>, record: Value, reason: impl Into<String>) -> Self {
    Self {
      step: step.into(),
      record,
      reason: reason.into(),
    }
  }

  pub(crate) fn from_invalid(step: &str, invalid: Invalid) -> Self {
    let reason = invalid.reason().to_string();
    Self::new(step, invalid.record, reason)
  }
}

/// Why a step did not produce a usable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
  /// The step body returned an error (or panicked) on every attempt.
  Step(String),
  /// The step's validator rejected some or all of its output.
  Validation { invalid: Vec<Invalid>, valid: Value },
}

impl Failure {
  /// Short description for log lines.
  pub fn summary(&self) -> String {
    match self {
      Failure::Step(reason) => reason.clone(),
      Failure::Validation { invalid, .. } => format!("{} invalid item(s)", invalid.len()),
    }
  }
}

/// Wall-clock durations, keyed by step name (and `<step>_validation`), in the order the
/// work ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
  entries: Vec<(String, Duration)>,
}

impl Metrics {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a measurement. Keys are unique within a run, so an existing key is never
  /// overwritten.
  pub(crate) fn record(&mut self, key: impl Into<String>, elapsed: Duration) {
    let key = key.into();
    debug_assert!(self.get(&key).is_none(), "metric key recorded twice: {key}");
    self.entries.push((key, elapsed));
  }

  pub fn get(&self, key: &str) -> Option<Duration> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, d)| *d)
  }

  /// Duration in seconds, the unit reported to callers.
  pub fn seconds(&self, key: &str) -> Option<f64> {
    self.get(key).map(|d| d.as_secs_f64())
  }

  pub fn keys(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(|(k, _)| k.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
    self.entries.iter().map(|(k, d)| (k.as_str(), *d))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn total(&self) -> Duration {
    self.entries.iter().map(|(_, d)| *d).sum()
  }
}

/// Outcome of [`Pipeline::run`](crate::Pipeline::run).
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
  /// Every step ran. Under `collect_errors`, `errors` lists what was dropped on the way.
  Completed {
    value: Value,
    errors: Vec<ErrorEntry>,
    metrics: Metrics,
  },
  /// A step failed under `fail_fast`; no further steps ran.
  Halted {
    step: String,
    failure: Failure,
    errors: Vec<ErrorEntry>,
    metrics: Metrics,
  },
}

impl RunOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, RunOutcome::Completed { .. })
  }

  /// Final value of a completed run.
  pub fn value(&self) -> Option<&Value> {
    match self {
      RunOutcome::Completed { value, .. } => Some(value),
      RunOutcome::Halted { .. } => None,
    }
  }

  pub fn errors(&self) -> &[ErrorEntry] {
    match self {
      RunOutcome::Completed { errors, .. } | RunOutcome::Halted { errors, .. } => errors,
    }
  }

  pub fn metrics(&self) -> &Metrics {
    match self {
      RunOutcome::Completed { metrics, .. } | RunOutcome::Halted { metrics, .. } => metrics,
    }
  }

  /// Name of the step that halted the run, if it halted.
  pub fn halted_at(&self) -> Option<&str> {
    match self {
      RunOutcome::Halted { step, .. } => Some(step),
      RunOutcome::Completed { .. } => None,
    }
  }
}
