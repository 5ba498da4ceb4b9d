// pipewright/src/pipeline/execution.rs

//! Contains `Pipeline::run()`: the step loop, the error-strategy dispatch, and metric
//! accumulation.
//!
//! A run moves through `Running(i)` for each step in declaration order and ends either
//! `Completed` (all steps consumed) or `Halted` (a failure under `fail_fast`). Every
//! failure path is represented as data in the returned [`RunOutcome`]; nothing a step or
//! validator does, panics included, escapes `run`.

use crate::core::outcome::{ErrorEntry, Failure, Metrics, RunOutcome, ValidationOutcome};
use crate::core::step::StepDef;
use crate::core::value::Value;
use crate::observer::{STEP_SPAN, VALIDATION_SPAN};
use crate::pipeline::definition::Pipeline;
use crate::pipeline::options::{ErrorStrategy, RunOptions};
use crate::retry::{RetryExecutor, RetryPolicy};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;
use tracing::{instrument, span, Level};

/// State threaded through one run. Owned by that run alone.
#[derive(Debug)]
struct RunState {
  value: Value,
  errors: Vec<ErrorEntry>,
  metrics: Metrics,
}

/// What happens after a step.
enum Transition {
  Advance(RunState),
  Halt { failure: Failure, state: RunState },
}

impl Pipeline {
  /// Runs every step, in order, over `initial`.
  ///
  /// Each step body is invoked through the retry executor under the pipeline's default
  /// policy (or this run's override for the step). If the step has a validator, its
  /// output is validated once, without retries. Failures are routed to
  /// `options.error_strategy`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      pipeline = %self.name,
      num_steps = self.steps.len(),
      strategy = %options.error_strategy,
    )
  )]
  pub fn run(&self, initial: impl Into<Value>, options: &RunOptions) -> RunOutcome {
    self.sink.emit(
      Level::INFO,
      "Pipeline run started",
      &[
        ("pipeline", self.name.clone()),
        ("steps", self.steps.len().to_string()),
        ("strategy", options.error_strategy.to_string()),
      ],
    );
    self.warn_unknown_overrides(options);

    let mut state = RunState {
      value: initial.into(),
      errors: Vec::new(),
      metrics: Metrics::new(),
    };

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let policy = options.policy_for(&step_def.name, &self.default_retry);
      match self.execute_step(step_idx, step_def, state, &policy, options.error_strategy) {
        Transition::Advance(next) => state = next,
        Transition::Halt { failure, state } => {
          self.sink.emit(
            Level::ERROR,
            "Pipeline halted",
            &[
              ("pipeline", self.name.clone()),
              ("step", step_def.name.clone()),
              ("failure", failure.summary()),
            ],
          );
          return RunOutcome::Halted {
            step: step_def.name.clone(),
            failure,
            errors: state.errors,
            metrics: state.metrics,
          };
        }
      }
    }

    self.sink.emit(
      Level::INFO,
      "Pipeline run completed",
      &[
        ("pipeline", self.name.clone()),
        ("errors", state.errors.len().to_string()),
        ("total_secs", state.metrics.total().as_secs_f64().to_string()),
      ],
    );
    RunOutcome::Completed {
      value: state.value,
      errors: state.errors,
      metrics: state.metrics,
    }
  }

  fn execute_step(
    &self,
    step_idx: usize,
    step_def: &StepDef,
    mut state: RunState,
    policy: &RetryPolicy,
    strategy: ErrorStrategy,
  ) -> Transition {
    let step_name = step_def.name.as_str();
    let step_span = span!(Level::INFO, "pipeline_step_execution", step_name, step_index = step_idx);
    let _step_span_guard = step_span.enter();

    self.sink.emit(
      Level::DEBUG,
      "Step started",
      &[("step", step_name.to_string()), ("index", step_idx.to_string())],
    );

    let started = Instant::now();
    let result = RetryExecutor::new(policy)
      .label(step_name)
      .event_sink(self.sink.as_ref())
      .sleeper(self.sleeper.as_ref())
      .run(|| invoke_body(step_def, &state.value));
    let elapsed = started.elapsed();

    state.metrics.record(step_name, elapsed);
    self.telemetry.record_span(STEP_SPAN, step_name, elapsed, result.is_ok());
    self.sink.emit(
      Level::DEBUG,
      "Step finished",
      &[
        ("step", step_name.to_string()),
        ("duration_secs", elapsed.as_secs_f64().to_string()),
        ("success", result.is_ok().to_string()),
      ],
    );

    let output = match result {
      Ok(output) => output,
      Err(reason) => return self.dispatch_failure(step_def, state, Failure::Step(reason), strategy),
    };

    let Some(validator) = &step_def.validator else {
      state.value = output;
      return Transition::Advance(state);
    };

    self.sink.emit(Level::DEBUG, "Validation started", &[("step", step_name.to_string())]);
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| validator(output)));
    let elapsed = started.elapsed();

    state.metrics.record(step_def.validation_metric_key(), elapsed);
    let passed = matches!(outcome, Ok(ValidationOutcome::Valid(_)));
    self.telemetry.record_span(VALIDATION_SPAN, step_name, elapsed, passed);
    self.sink.emit(
      Level::DEBUG,
      "Validation finished",
      &[
        ("step", step_name.to_string()),
        ("duration_secs", elapsed.as_secs_f64().to_string()),
        ("valid", passed.to_string()),
      ],
    );

    match outcome {
      Ok(ValidationOutcome::Valid(validated)) => {
        state.value = validated;
        Transition::Advance(state)
      }
      Ok(ValidationOutcome::Partitioned { invalid, valid }) => {
        self.dispatch_failure(step_def, state, Failure::Validation { invalid, valid }, strategy)
      }
      Err(payload) => {
        let reason = format!("validator for step '{}' panicked: {}", step_name, panic_message(&*payload));
        self.dispatch_failure(step_def, state, Failure::Step(reason), strategy)
      }
    }
  }

  /// Applies the error strategy to a failed step.
  ///
  /// Under `fail_fast` the run halts with the failure; a validation halt reports the
  /// invalid items and an empty valid set.
  ///
  /// Under `collect_errors` a step-body failure becomes a single entry whose record is
  /// the step's input, and that input is carried forward unchanged. A validation failure
  /// becomes one entry per invalid item, and the valid remainder is carried forward.
  fn dispatch_failure(
    &self,
    step_def: &StepDef,
    mut state: RunState,
    failure: Failure,
    strategy: ErrorStrategy,
  ) -> Transition {
    if strategy == ErrorStrategy::FailFast {
      // A halted run carries nothing forward, so the valid remainder is reported empty.
      let failure = match failure {
        Failure::Validation { invalid, valid } => Failure::Validation {
          invalid,
          valid: emptied(&valid),
        },
        step_failure => step_failure,
      };
      return Transition::Halt { failure, state };
    }

    let before = state.errors.len();
    match failure {
      Failure::Step(reason) => {
        let record = state.value.clone();
        state.errors.push(ErrorEntry::new(&step_def.name, record, reason));
      }
      Failure::Validation { invalid, valid } => {
        state
          .errors
          .extend(invalid.into_iter().map(|item| ErrorEntry::from_invalid(&step_def.name, item)));
        state.value = valid;
      }
    }

    self.sink.emit(
      Level::WARN,
      "Errors collected, continuing",
      &[
        ("step", step_def.name.clone()),
        ("collected", (state.errors.len() - before).to_string()),
        ("total_errors", state.errors.len().to_string()),
      ],
    );
    Transition::Advance(state)
  }

  fn warn_unknown_overrides(&self, options: &RunOptions) {
    for step in options.overridden_steps() {
      if self.step(step).is_none() {
        self.sink.emit(
          Level::WARN,
          "Retry override names an unknown step; ignoring it",
          &[("pipeline", self.name.clone()), ("step", step.to_string())],
        );
      }
    }
  }
}

/// Invokes a step body on a copy of `input`, converting both returned errors and panics
/// into the failure reason handed to the retry executor.
fn invoke_body(step_def: &StepDef, input: &Value) -> Result<Value, String> {
  let input = input.clone();
  match panic::catch_unwind(AssertUnwindSafe(|| (step_def.body)(input))) {
    Ok(Ok(output)) => Ok(output),
    Ok(Err(err)) => Err(format!("{err:#}")),
    Err(payload) => Err(format!("step '{}' panicked: {}", step_def.name, panic_message(&*payload))),
  }
}

/// An empty value of the same shape: `[]` for a list, `Null` otherwise.
fn emptied(valid: &Value) -> Value {
  match valid {
    Value::List(_) => Value::List(Vec::new()),
    _ => Value::Null,
  }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
  if let Some(msg) = payload.downcast_ref::<&str>() {
    (*msg).to_string()
  } else if let Some(msg) = payload.downcast_ref::<String>() {
    msg.clone()
  } else {
    "unknown panic payload".to_string()
  }
}
