// pipewright/src/error.rs

//! Errors raised while *building* or *configuring* a pipeline.
//!
//! Failures that happen while a pipeline runs are never returned as errors: they are
//! carried as data inside [`RunOutcome`](crate::RunOutcome).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipewrightError {
  #[error("Step name must not be empty (position {position})")]
  EmptyStepName { position: usize },

  #[error("Step '{step_name}' is declared more than once")]
  DuplicateStep { step_name: String },

  #[error("Step '{step_name}' collides with the validation metric key of step '{validated_step}'")]
  MetricKeyCollision {
    step_name: String,
    validated_step: String,
  },

  #[error("Unknown error strategy '{value}' (expected 'fail_fast' or 'collect_errors')")]
  UnknownStrategy { value: String },
}

pub type PipewrightResult<T, E = PipewrightError> = std::result::Result<T, E>;
