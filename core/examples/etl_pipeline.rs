// pipewright/examples/etl_pipeline.rs

use anyhow::Context;
use pipewright::{ErrorStrategy, Pipeline, RunOptions, RunOutcome, ValidationOutcome, Value};
use tracing::info;

fn scale(factor: i64) -> impl Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static {
  move |value: Value| {
    let items = value.into_list().context("transform expects a list")?;
    items
      .into_iter()
      .map(|item| item.as_i64().map(|n| Value::Integer(n * factor)).context("transform expects integers"))
      .collect::<anyhow::Result<Vec<_>>>()
      .map(Value::List)
  }
}

fn load(value: Value) -> anyhow::Result<Value> {
  let items = value.into_list().context("load expects a list")?;
  Ok(Value::Integer(items.iter().filter_map(Value::as_i64).sum()))
}

fn report(label: &str, outcome: &RunOutcome) {
  match outcome {
    RunOutcome::Completed { value, errors, metrics } => {
      info!("{label}: completed with {value}");
      for entry in errors {
        info!("  dropped at '{}': {} ({})", entry.step, entry.record, entry.reason);
      }
      for (key, elapsed) in metrics.iter() {
        info!("  {key}: {:.6}s", elapsed.as_secs_f64());
      }
    }
    RunOutcome::Halted { step, failure, .. } => {
      info!("{label}: halted at '{step}': {}", failure.summary());
    }
  }
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- Extract / Transform / Load ---");
  let doubling = Pipeline::builder("doubling")
    .step("extract", Ok)
    .step("transform", scale(2))
    .step("load", load)
    .build()?;
  let outcome = doubling.run(Value::list([1, 2, 3, 4, 5]), &RunOptions::default());
  report("doubling", &outcome);
  assert_eq!(outcome.value(), Some(&Value::from(30)));

  info!("--- Same pipeline, tripling with a validator ---");
  let tripling = Pipeline::builder("tripling")
    .step("extract", Ok)
    .validated_step("transform", scale(3), |value: Value| {
      ValidationOutcome::partition_by(value, |item| item.as_i64().is_some_and(|n| n <= 8))
    })
    .step("load", load)
    .build()?;

  for strategy in [ErrorStrategy::CollectErrors, ErrorStrategy::FailFast] {
    let outcome = tripling.run(Value::list([1, 2, 3, 4, 5]), &RunOptions::new().error_strategy(strategy));
    report(strategy.as_str(), &outcome);
  }

  Ok(())
}
