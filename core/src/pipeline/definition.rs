// pipewright/src/pipeline/definition.rs

//! Contains the `Pipeline` struct and the `PipelineBuilder` that assembles its ordered,
//! immutable list of steps.

use crate::core::outcome::ValidationOutcome;
use crate::core::step::StepDef;
use crate::core::value::Value;
use crate::error::{PipewrightError, PipewrightResult};
use crate::observer::{EventSink, Telemetry, TracingSink, TracingTelemetry};
use crate::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{event, Level};

/// An ordered sequence of named steps plus the collaborators a run reports to.
///
/// A `Pipeline` is immutable once built and can be run any number of times, from any
/// number of threads; each run owns its own state.
pub struct Pipeline {
  pub(crate) name: String,
  /// Ordered list of step definitions for this pipeline.
  pub(crate) steps: Vec<StepDef>,
  pub(crate) default_retry: RetryPolicy,

  pub(crate) sink: Arc<dyn EventSink>,
  pub(crate) telemetry: Arc<dyn Telemetry>,
  pub(crate) sleeper: Arc<dyn Sleeper>,
}

impl Pipeline {
  pub fn builder(name: impl Into<String>) -> PipelineBuilder {
    PipelineBuilder::new(name)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> impl Iterator<Item = &str> {
    self.steps.iter().map(|s| s.name.as_str())
  }

  pub fn step(&self, name: &str) -> Option<&StepDef> {
    self.steps.iter().find(|s| s.name == name)
  }

  pub fn len(&self) -> usize {
    self.steps.len()
  }

  pub fn is_empty(&self) -> bool {
    self.steps.is_empty()
  }

  pub fn default_retry(&self) -> &RetryPolicy {
    &self.default_retry
  }
}

impl std::fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .field("default_retry", &self.default_retry)
      .finish_non_exhaustive()
  }
}

/// Collects step definitions in order and validates them into a [`Pipeline`].
pub struct PipelineBuilder {
  name: String,
  steps: Vec<StepDef>,
  default_retry: RetryPolicy,
  sink: Arc<dyn EventSink>,
  telemetry: Arc<dyn Telemetry>,
  sleeper: Arc<dyn Sleeper>,
}

impl PipelineBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      steps: Vec::new(),
      default_retry: RetryPolicy::default(),
      sink: Arc::new(TracingSink),
      telemetry: Arc::new(TracingTelemetry),
      sleeper: Arc::new(ThreadSleeper),
    }
  }

  /// Appends a step without a validator; its output is forwarded as is.
  #[must_use]
  pub fn step<F>(self, name: impl Into<String>, body: F) -> Self
  where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    self.add_step(StepDef::new(name, body))
  }

  /// Appends a step whose output is passed through `validator` before the next step.
  #[must_use]
  pub fn validated_step<F, V>(self, name: impl Into<String>, body: F, validator: V) -> Self
  where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    V: Fn(Value) -> ValidationOutcome + Send + Sync + 'static,
  {
    self.add_step(StepDef::new(name, body).with_validator(validator))
  }

  #[must_use]
  pub fn add_step(mut self, step: StepDef) -> Self {
    self.steps.push(step);
    self
  }

  /// Retry policy for every step that has no per-run override.
  #[must_use]
  pub fn default_retry(mut self, policy: RetryPolicy) -> Self {
    self.default_retry = policy;
    self
  }

  #[must_use]
  pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
    self.sink = sink;
    self
  }

  #[must_use]
  pub fn telemetry(mut self, telemetry: Arc<dyn Telemetry>) -> Self {
    self.telemetry = telemetry;
    self
  }

  #[must_use]
  pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
    self.sleeper = sleeper;
    self
  }

  /// Checks step names and freezes the step list.
  ///
  /// Names must be non-empty and unique, and no step may be named like another step's
  /// validation metric (`<step>_validation`), so metric keys never collide.
  pub fn build(self) -> PipewrightResult<Pipeline> {
    let mut seen = HashSet::with_capacity(self.steps.len());
    for (position, step) in self.steps.iter().enumerate() {
      if step.name.is_empty() {
        return Err(PipewrightError::EmptyStepName { position });
      }
      if !seen.insert(step.name.as_str()) {
        return Err(PipewrightError::DuplicateStep {
          step_name: step.name.clone(),
        });
      }
    }

    for validated in self.steps.iter().filter(|s| s.validator.is_some()) {
      let metric_key = validated.validation_metric_key();
      if seen.contains(metric_key.as_str()) {
        return Err(PipewrightError::MetricKeyCollision {
          step_name: metric_key,
          validated_step: validated.name.clone(),
        });
      }
    }

    event!(Level::DEBUG, pipeline = %self.name, num_steps = self.steps.len(), "Pipeline built.");
    Ok(Pipeline {
      name: self.name,
      steps: self.steps,
      default_retry: self.default_retry,
      sink: self.sink,
      telemetry: self.telemetry,
      sleeper: self.sleeper,
    })
  }
}
