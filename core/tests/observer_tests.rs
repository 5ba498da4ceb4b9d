// tests/observer_tests.rs
mod common;
use common::*;
use parking_lot::Mutex;
use pipewright::{EventSink, TracingSink};
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// A field as `tracing` delivered it, tagged with the type it arrived as.
#[derive(Debug, Clone, PartialEq)]
enum Captured {
  Str(String),
  U64(u64),
  F64(f64),
  Debug(String),
}

#[derive(Default)]
struct FieldVisitor(Vec<(String, Captured)>);

impl Visit for FieldVisitor {
  fn record_str(&mut self, field: &Field, value: &str) {
    self.0.push((field.name().to_string(), Captured::Str(value.to_string())));
  }

  fn record_u64(&mut self, field: &Field, value: u64) {
    self.0.push((field.name().to_string(), Captured::U64(value)));
  }

  fn record_f64(&mut self, field: &Field, value: f64) {
    self.0.push((field.name().to_string(), Captured::F64(value)));
  }

  fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
    self.0.push((field.name().to_string(), Captured::Debug(format!("{value:?}"))));
  }
}

#[derive(Clone, Default)]
struct CaptureLayer(Arc<Mutex<Vec<Vec<(String, Captured)>>>>);

impl CaptureLayer {
  fn events(&self) -> Vec<Vec<(String, Captured)>> {
    self.0.lock().clone()
  }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
  fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);
    self.0.lock().push(visitor.0);
  }
}

fn field<'a>(fields: &'a [(String, Captured)], name: &str) -> Option<&'a Captured> {
  fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

#[test]
fn test_tracing_sink_sends_step_fields_as_typed_values() {
  setup_tracing();
  let capture = CaptureLayer::default();
  let subscriber = tracing_subscriber::registry().with(capture.clone());

  tracing::subscriber::with_default(subscriber, || {
    TracingSink.emit(
      Level::WARN,
      "Attempt failed, retrying",
      &[
        ("step", "fetch".to_string()),
        ("attempt", "2".to_string()),
        ("max_attempts", "3".to_string()),
        ("error", "timeout".to_string()),
      ],
    );
    TracingSink.emit(
      Level::WARN,
      "Step finished",
      &[("step", "load".to_string()), ("duration_secs", "0.25".to_string())],
    );
  });

  let events = capture.events();
  assert_eq!(events.len(), 2);

  let retry = &events[0];
  assert_eq!(field(retry, "step"), Some(&Captured::Str("fetch".to_string())));
  assert_eq!(field(retry, "attempt"), Some(&Captured::U64(2)));
  assert_eq!(field(retry, "duration_secs"), None);
  // Only the leftover keys are flattened.
  assert_eq!(
    field(retry, "metadata"),
    Some(&Captured::Debug("max_attempts=3 error=timeout".to_string()))
  );

  let finished = &events[1];
  assert_eq!(field(finished, "step"), Some(&Captured::Str("load".to_string())));
  assert_eq!(field(finished, "duration_secs"), Some(&Captured::F64(0.25)));
  assert_eq!(field(finished, "attempt"), None);
  assert_eq!(field(finished, "metadata"), Some(&Captured::Debug(String::new())));
}
