// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use anyhow::Context;
use parking_lot::Mutex;
use pipewright::{
  ErrorStrategy, Pipeline, PipelineBuilder, RecordingSink, RetryPolicy, Schema, Sleeper, Telemetry, TypeTag,
  ValidationOutcome, Value,
};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;

// --- Common Error Type for Tests ---
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("transient failure #{0}")]
  Transient(usize),

  #[error("permanent failure")]
  Permanent,
}

// --- Collaborators that record instead of acting ---

/// Records every requested delay without sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
  delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
  pub fn delays(&self) -> Vec<Duration> {
    self.delays.lock().clone()
  }
}

impl Sleeper for RecordingSleeper {
  fn sleep(&self, delay: Duration) {
    self.delays.lock().push(delay);
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpanRecord {
  pub span: &'static str,
  pub step: String,
  pub success: bool,
}

#[derive(Debug, Default)]
pub struct RecordingTelemetry {
  spans: Mutex<Vec<SpanRecord>>,
}

impl RecordingTelemetry {
  pub fn spans(&self) -> Vec<SpanRecord> {
    self.spans.lock().clone()
  }
}

impl Telemetry for RecordingTelemetry {
  fn record_span(&self, span: &'static str, step: &str, _elapsed: Duration, success: bool) {
    self.spans.lock().push(SpanRecord {
      span,
      step: step.to_string(),
      success,
    });
  }
}

/// A builder wired to recording collaborators, so tests never actually sleep.
pub struct Harness {
  pub sink: Arc<RecordingSink>,
  pub sleeper: Arc<RecordingSleeper>,
  pub telemetry: Arc<RecordingTelemetry>,
}

impl Harness {
  pub fn new() -> Self {
    Self {
      sink: Arc::new(RecordingSink::new()),
      sleeper: Arc::new(RecordingSleeper::default()),
      telemetry: Arc::new(RecordingTelemetry::default()),
    }
  }

  pub fn builder(&self, name: &str) -> PipelineBuilder {
    Pipeline::builder(name)
      .event_sink(self.sink.clone())
      .sleeper(self.sleeper.clone())
      .telemetry(self.telemetry.clone())
  }

  pub fn messages_at(&self, level: Level) -> Vec<String> {
    self.sink.at_level(level).into_iter().map(|e| e.message).collect()
  }
}

// --- Common Step Bodies ---

pub fn ints(values: &[i64]) -> Value {
  Value::list(values.iter().copied())
}

pub fn passthrough(value: Value) -> anyhow::Result<Value> {
  Ok(value)
}

pub fn scale(factor: i64) -> impl Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static {
  move |value: Value| {
    let items = value.into_list().context("expected a list")?;
    items
      .into_iter()
      .map(|item| item.as_i64().map(|n| Value::Integer(n * factor)).context("expected integers"))
      .collect::<anyhow::Result<Vec<_>>>()
      .map(Value::List)
  }
}

pub fn sum(value: Value) -> anyhow::Result<Value> {
  let items = value.into_list().context("expected a list")?;
  let total = items.iter().filter_map(Value::as_i64).sum::<i64>();
  Ok(Value::Integer(total))
}

pub fn at_most(limit: i64) -> impl Fn(Value) -> ValidationOutcome + Send + Sync + 'static {
  move |value: Value| ValidationOutcome::partition_by(value, |item| item.as_i64().is_some_and(|n| n <= limit))
}

/// Fails the first `failures` calls, then echoes its input. Counts every call.
pub fn flaky(failures: usize, calls: Arc<AtomicUsize>) -> impl Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static {
  move |value: Value| {
    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call <= failures {
      Err(TestError::Transient(call).into())
    } else {
      Ok(value)
    }
  }
}

/// Scenario pipeline: extract -> transform (scaled by `factor`) -> load (sum), with an
/// optional `<= limit` validator on transform.
pub fn etl_pipeline(harness: &Harness, factor: i64, limit: Option<i64>) -> Pipeline {
  let builder = harness.builder("etl").step("extract", passthrough);
  let builder = match limit {
    Some(limit) => builder.validated_step("transform", scale(factor), at_most(limit)),
    None => builder.step("transform", scale(factor)),
  };
  builder.step("load", sum).build().expect("etl pipeline should build")
}

// --- Record fixtures ---

pub fn person(name: &str, age: impl Into<Value>) -> Value {
  Value::map([("name", Value::from(name)), ("age", age.into())])
}

pub fn person_schema() -> Schema {
  Schema::new()
    .field("name", vec![pipewright::required(), pipewright::of_type(TypeTag::String)])
    .field("age", vec![pipewright::required(), pipewright::of_type(TypeTag::Integer)])
}

pub fn increment_ages(value: Value) -> anyhow::Result<Value> {
  let people = value.into_list().context("expected a list of people")?;
  let people = people
    .into_iter()
    .map(|mut p| {
      if let Some(Value::Integer(age)) = p.get_mut("age") {
        *age += 1;
      }
      p
    })
    .collect::<Vec<_>>();
  Ok(Value::List(people))
}

pub fn strategy_options(strategy: ErrorStrategy) -> pipewright::RunOptions {
  pipewright::RunOptions::new().error_strategy(strategy)
}

pub fn quick_policy(attempts: u32) -> RetryPolicy {
  RetryPolicy::new()
    .with_max_attempts(attempts)
    .with_initial_delay(Duration::from_millis(10))
    .with_max_delay(Duration::from_millis(40))
}

/// Runs `f` with the process-wide panic hook silenced. Callers must be `#[serial]`.
pub fn with_silenced_panics<R>(f: impl FnOnce() -> R) -> R {
  let previous = std::panic::take_hook();
  std::panic::set_hook(Box::new(|_| {}));
  let result = f();
  std::panic::set_hook(previous);
  result
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
