// pipewright/src/observer.rs

//! Collaborators the orchestrator reports to: an event sink for leveled log events and a
//! telemetry emitter for timed spans.
//!
//! Both are injected into a [`Pipeline`](crate::Pipeline) when it is built. The defaults
//! forward to `tracing`; tests install [`RecordingSink`] to assert on what was emitted.

use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tracing::{event, Level};

/// Key/value pairs attached to an event.
pub type Metadata<'a> = &'a [(&'static str, String)];

/// Receives leveled events from the orchestrator and the retry executor.
pub trait EventSink: Send + Sync {
  fn emit(&self, level: Level, message: &str, metadata: Metadata<'_>);
}

/// Default sink: every event becomes a `tracing` event at the same level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

pub(crate) static TRACING_SINK: TracingSink = TracingSink;

/// Keys sent to `tracing` as typed fields instead of through the flattened `metadata`.
const TYPED_KEYS: [&str; 3] = ["step", "attempt", "duration_secs"];

/// Metadata left over once the typed keys are taken out.
struct DisplayMetadata<'a>(Metadata<'a>);

impl fmt::Display for DisplayMetadata<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rest = self.0.iter().filter(|(key, _)| !TYPED_KEYS.contains(key));
    for (idx, (key, value)) in rest.enumerate() {
      if idx > 0 {
        f.write_str(" ")?;
      }
      write!(f, "{key}={value}")?;
    }
    Ok(())
  }
}

fn lookup<'a>(metadata: Metadata<'a>, key: &str) -> Option<&'a str> {
  metadata.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

impl EventSink for TracingSink {
  fn emit(&self, level: Level, message: &str, metadata: Metadata<'_>) {
    let step = lookup(metadata, "step");
    let attempt = lookup(metadata, "attempt").and_then(|a| a.parse::<u64>().ok());
    let duration_secs = lookup(metadata, "duration_secs").and_then(|d| d.parse::<f64>().ok());
    let meta = DisplayMetadata(metadata);

    // `event!` needs a constant level.
    macro_rules! forward {
      ($level:expr) => {
        event!(
          target: "pipewright",
          $level,
          step,
          attempt,
          duration_secs,
          metadata = %meta,
          "{}",
          message
        )
      };
    }
    if level == Level::ERROR {
      forward!(Level::ERROR);
    } else if level == Level::WARN {
      forward!(Level::WARN);
    } else if level == Level::INFO {
      forward!(Level::INFO);
    } else if level == Level::DEBUG {
      forward!(Level::DEBUG);
    } else {
      forward!(Level::TRACE);
    }
  }
}

/// An event captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
  pub level: Level,
  pub message: String,
  pub metadata: Vec<(&'static str, String)>,
}

impl RecordedEvent {
  pub fn meta(&self, key: &str) -> Option<&str> {
    self.metadata.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
  }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
  events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn events(&self) -> Vec<RecordedEvent> {
    self.events.lock().clone()
  }

  /// Events at exactly `level`.
  pub fn at_level(&self, level: Level) -> Vec<RecordedEvent> {
    self.events.lock().iter().filter(|e| e.level == level).cloned().collect()
  }

  pub fn messages(&self) -> Vec<String> {
    self.events.lock().iter().map(|e| e.message.clone()).collect()
  }

  pub fn clear(&self) {
    self.events.lock().clear();
  }
}

impl EventSink for RecordingSink {
  fn emit(&self, level: Level, message: &str, metadata: Metadata<'_>) {
    self.events.lock().push(RecordedEvent {
      level,
      message: message.to_string(),
      metadata: metadata.to_vec(),
    });
  }
}

/// Span name for a step body (including all its retries).
pub const STEP_SPAN: &str = "pipeline.step.duration";
/// Span name for a step's validation.
pub const VALIDATION_SPAN: &str = "pipeline.validation.duration";

/// Records the duration and outcome of a named unit of work. Aggregation and reporting
/// are the implementor's concern.
pub trait Telemetry: Send + Sync {
  fn record_span(&self, span: &'static str, step: &str, elapsed: Duration, success: bool);
}

/// Emits each span as a `tracing` event on the `pipewright::telemetry` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
  fn record_span(&self, span: &'static str, step: &str, elapsed: Duration, success: bool) {
    event!(
      target: "pipewright::telemetry",
      Level::DEBUG,
      span_name = span,
      step,
      duration_secs = elapsed.as_secs_f64(),
      success,
      "span recorded"
    );
  }
}

/// Discards every span.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
  fn record_span(&self, _span: &'static str, _step: &str, _elapsed: Duration, _success: bool) {}
}
