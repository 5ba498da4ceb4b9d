// pipewright/examples/retry_backoff.rs

use pipewright::{Pipeline, RetryOverride, RetryPolicy, RunOptions, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

fn main() -> anyhow::Result<()> {
  // Retry warnings and the exhaustion error are emitted through the default tracing sink.
  tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

  let calls = Arc::new(AtomicUsize::new(0));
  let calls_in_step = calls.clone();

  let pipeline = Pipeline::builder("flaky-fetch")
    .default_retry(
      RetryPolicy::new()
        .with_max_attempts(2)
        .with_initial_delay(Duration::from_millis(50))
        .with_max_delay(Duration::from_millis(200)),
    )
    .step("fetch", move |value| {
      let call = calls_in_step.fetch_add(1, Ordering::SeqCst) + 1;
      if call < 4 {
        anyhow::bail!("connection reset (call {call})");
      }
      Ok(value)
    })
    .build()?;

  // The default two attempts are not enough; give `fetch` five for this run.
  let options = RunOptions::fail_fast().retry("fetch", RetryOverride::new().max_attempts(5));
  let outcome = pipeline.run(Value::from("payload"), &options);

  info!(
    "completed: {}, calls: {}, fetch took {:.3}s",
    outcome.is_completed(),
    calls.load(Ordering::SeqCst),
    outcome.metrics().seconds("fetch").unwrap_or_default()
  );
  Ok(())
}
