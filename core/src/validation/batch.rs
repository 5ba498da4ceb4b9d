// pipewright/src/validation/batch.rs

//! Builders for [`ValidationOutcome`], so a step validator can check one record or a
//! whole batch and hand the orchestrator a valid/invalid partition.

use super::schema::Schema;
use crate::core::outcome::{Invalid, ValidationOutcome};
use crate::core::value::Value;

impl ValidationOutcome {
  /// Checks a single record. A failure rejects the record with its field error as the
  /// reason and leaves nothing to continue with.
  pub fn check(value: Value, schema: &Schema) -> Self {
    match schema.check(&value) {
      Ok(()) => ValidationOutcome::Valid(value),
      Err(err) => ValidationOutcome::Partitioned {
        invalid: vec![Invalid::with_reason(value, err.to_string())],
        valid: Value::Null,
      },
    }
  }

  /// Checks every record of a list against `schema`. Rejected records carry their field
  /// error; the rest stay in order as the valid remainder. A non-list is checked as one
  /// record.
  pub fn partition(value: Value, schema: &Schema) -> Self {
    let items = match value {
      Value::List(items) => items,
      single => return Self::check(single, schema),
    };

    let mut valid = Vec::with_capacity(items.len());
    let mut invalid = Vec::new();
    for item in items {
      match schema.check(&item) {
        Ok(()) => valid.push(item),
        Err(err) => invalid.push(Invalid::with_reason(item, err.to_string())),
      }
    }
    Self::from_parts(invalid, valid)
  }

  /// Splits a list by `keep`. Rejected items carry no explicit reason. A non-list is
  /// treated as a one-item batch whose remainder is `Null` if rejected.
  pub fn partition_by<F>(value: Value, keep: F) -> Self
  where
    F: Fn(&Value) -> bool,
  {
    let items = match value {
      Value::List(items) => items,
      single if keep(&single) => return ValidationOutcome::Valid(single),
      single => {
        return ValidationOutcome::Partitioned {
          invalid: vec![Invalid::new(single)],
          valid: Value::Null,
        }
      }
    };

    let (valid, rejected): (Vec<Value>, Vec<Value>) = items.into_iter().partition(|item| keep(item));
    Self::from_parts(rejected.into_iter().map(Invalid::new).collect(), valid)
  }

  fn from_parts(invalid: Vec<Invalid>, valid: Vec<Value>) -> Self {
    if invalid.is_empty() {
      ValidationOutcome::Valid(Value::List(valid))
    } else {
      ValidationOutcome::Partitioned {
        invalid,
        valid: Value::List(valid),
      }
    }
  }
}
