// src/lib.rs

//! Pipewright: a synchronous, in-process orchestrator for multi-stage data pipelines.
//!
//! A pipeline is an ordered list of named steps, each transforming an accumulated
//! [`Value`]. Pipewright adds:
//!  - Bounded retry with exponential backoff around every step body.
//!  - Optional per-step validators, either schema-driven or batch partitions.
//!  - Two error strategies: `fail_fast` (halt on the first failure) and
//!    `collect_errors` (record failures, continue with the valid data).
//!  - Per-step timing metrics, reported alongside the result.
//!  - Injected event-sink and telemetry collaborators instead of global state.

pub mod core;
pub mod error;
pub mod observer;
pub mod pipeline;
pub mod retry;
pub mod validation;

// --- Re-exports for the Public API ---

// Data model
pub use crate::core::outcome::{ErrorEntry, Failure, Invalid, Metrics, RunOutcome, ValidationOutcome};
pub use crate::core::step::{StepDef, StepFn, ValidatorFn};
pub use crate::core::value::{Handle, HandleKind, Record, TypeTag, Value};

// The main Pipeline struct, its builder and run options
pub use crate::pipeline::{ErrorStrategy, Pipeline, PipelineBuilder, RunOptions};

pub use crate::retry::{retry_with_backoff, RetryExecutor, RetryOverride, RetryPolicy, Sleeper, ThreadSleeper};

pub use crate::validation::{of_type, required, validate, FieldError, FieldValidator, Schema};

pub use crate::observer::{EventSink, NoopTelemetry, RecordingSink, Telemetry, TracingSink, TracingTelemetry};

pub use crate::error::{PipewrightError, PipewrightResult};

/*
    Core Workflow:
    1. Build a `Pipeline` with `Pipeline::builder("name")`, appending steps in order
       with `.step(name, body)` or `.validated_step(name, body, validator)`.
    2. Optionally set a default `RetryPolicy`, an `EventSink`, `Telemetry`, or `Sleeper`.
    3. Call `.build()`; step names are checked here.
    4. Call `pipeline.run(initial_value, &RunOptions::...)` and match on the `RunOutcome`.
*/
