// pipewright/src/core/step.rs

//! Defines a single step of a pipeline: its name, body, and optional validator.

use super::outcome::ValidationOutcome;
use super::value::Value;
use std::sync::Arc;

/// Body of a step: transforms the accumulated value or fails with a reason.
pub type StepFn = Arc<dyn Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static>;

/// Validator attached to a step. Runs on the step's output; never retried.
pub type ValidatorFn = Arc<dyn Fn(Value) -> ValidationOutcome + Send + Sync + 'static>;

/// Suffix of the metric key recorded for a step's validation.
pub const VALIDATION_METRIC_SUFFIX: &str = "_validation";

/// Definition of a pipeline step.
#[derive(Clone)]
pub struct StepDef {
  pub name: String,
  pub body: StepFn,
  pub validator: Option<ValidatorFn>,
}

impl StepDef {
  pub fn new<F>(name: impl Into<String>, body: F) -> Self
  where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    Self {
      name: name.into(),
      body: Arc::new(body),
      validator: None,
    }
  }

  #[must_use]
  pub fn with_validator<V>(mut self, validator: V) -> Self
  where
    V: Fn(Value) -> ValidationOutcome + Send + Sync + 'static,
  {
    self.validator = Some(Arc::new(validator));
    self
  }

  /// Key under which this step's validation duration is recorded.
  pub fn validation_metric_key(&self) -> String {
    format!("{}{}", self.name, VALIDATION_METRIC_SUFFIX)
  }
}

// Closures are not Debug; report only whether a validator is attached.
impl std::fmt::Debug for StepDef {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("validator_present", &self.validator.is_some())
      .finish()
  }
}
