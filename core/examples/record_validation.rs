// pipewright/examples/record_validation.rs

use anyhow::Context;
use pipewright::{of_type, required, Pipeline, RunOptions, RunOutcome, Schema, TypeTag, ValidationOutcome, Value};
use tracing::{info, warn};

fn user(name: &str, age: impl Into<Value>) -> Value {
  Value::map([("name", Value::from(name)), ("age", age.into())])
}

fn user_schema() -> Schema {
  Schema::new()
    .field("name", vec![required(), of_type(TypeTag::String)])
    .field("age", vec![required(), of_type(TypeTag::Integer)])
}

fn birthday(value: Value) -> anyhow::Result<Value> {
  let mut users = value.into_list().context("expected a list of users")?;
  for user in &mut users {
    if let Some(Value::Integer(age)) = user.get_mut("age") {
      *age += 1;
    }
  }
  Ok(Value::List(users))
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  let pipeline = Pipeline::builder("users")
    .validated_step("extract", Ok, |users: Value| ValidationOutcome::partition(users, &user_schema()))
    .step("birthday", birthday)
    .build()?;

  let users = Value::List(vec![user("Alice", 30), user("Bob", "25"), user("Cara", 41)]);

  info!("--- collect_errors ---");
  let outcome = pipeline.run(users.clone(), &RunOptions::collect_errors());
  if let Some(value) = outcome.value() {
    info!("valid users: {value}");
  }
  for entry in outcome.errors() {
    warn!("rejected at '{}': {} ({})", entry.step, entry.record, entry.reason);
  }

  info!("--- fail_fast ---");
  match pipeline.run(users, &RunOptions::fail_fast()) {
    RunOutcome::Halted { step, failure, errors, .. } => {
      info!("halted at '{step}' ({}), {} earlier error(s)", failure.summary(), errors.len());
    }
    RunOutcome::Completed { value, .. } => info!("completed with {value}"),
  }

  Ok(())
}
