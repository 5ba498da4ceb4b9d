// pipewright/src/validation/schema.rs

//! Schema-driven field checks.
//!
//! A [`Schema`] is an ordered list of fields, each with an ordered list of
//! [`FieldValidator`]s. [`validate`] walks fields and validators in declaration order and
//! stops at the first failure.

use crate::core::value::{TypeTag, Value};
use std::fmt;
use thiserror::Error;

/// Message returned by [`required`] for a null or missing field.
pub const REQUIRED_MESSAGE: &str = "Field is required";

/// A single predicate applied to one field's value. Missing fields are passed as
/// [`Value::Null`].
///
/// Any `Fn(&Value) -> Result<(), String>` is a `FieldValidator`, which is how custom
/// checks are plugged in.
pub trait FieldValidator: Send + Sync {
  fn check(&self, value: &Value) -> Result<(), String>;
}

impl<F> FieldValidator for F
where
  F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
  fn check(&self, value: &Value) -> Result<(), String> {
    self(value)
  }
}

/// Fails iff the value is null or absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl FieldValidator for Required {
  fn check(&self, value: &Value) -> Result<(), String> {
    if value.is_null() {
      Err(REQUIRED_MESSAGE.to_string())
    } else {
      Ok(())
    }
  }
}

/// Passes for null (absence is [`Required`]'s concern) or a value tagged `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfType {
  pub expected: TypeTag,
}

impl FieldValidator for OfType {
  fn check(&self, value: &Value) -> Result<(), String> {
    if value.is_null() || value.has_tag(&self.expected) {
      Ok(())
    } else {
      Err(format!("Expected type {}, got {}", self.expected, value))
    }
  }
}

pub fn required() -> Box<dyn FieldValidator> {
  Box::new(Required)
}

pub fn of_type(expected: TypeTag) -> Box<dyn FieldValidator> {
  Box::new(OfType { expected })
}

/// Wraps a closure as a boxed validator, for mixing with the built-ins in one list.
pub fn custom<F>(check: F) -> Box<dyn FieldValidator>
where
  F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
{
  Box::new(check)
}

/// Ordered mapping of field name to ordered validators.
#[derive(Default)]
pub struct Schema {
  fields: Vec<(String, Vec<Box<dyn FieldValidator>>)>,
}

impl Schema {
  pub fn new() -> Self {
    Self::default()
  }

  /// Appends a field. Declaring the same field twice checks it twice, in order.
  #[must_use]
  pub fn field(mut self, name: impl Into<String>, validators: Vec<Box<dyn FieldValidator>>) -> Self {
    self.fields.push((name.into(), validators));
    self
  }

  pub fn field_names(&self) -> impl Iterator<Item = &str> {
    self.fields.iter().map(|(name, _)| name.as_str())
  }

  pub fn len(&self) -> usize {
    self.fields.len()
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }

  /// Checks `value` without taking ownership.
  pub fn check(&self, value: &Value) -> Result<(), FieldError> {
    for (field, validators) in &self.fields {
      let field_value = value.get(field).unwrap_or(&Value::Null);
      for validator in validators {
        validator.check(field_value).map_err(|reason| FieldError {
          field: field.clone(),
          reason,
        })?;
      }
    }
    Ok(())
  }
}

impl fmt::Debug for Schema {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list()
      .entries(self.fields.iter().map(|(name, validators)| (name, validators.len())))
      .finish()
  }
}

/// First failing field of a [`validate`] call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {field}: {reason}")]
pub struct FieldError {
  pub field: String,
  pub reason: String,
}

/// Validates `value` against `schema`, returning it unchanged on success.
pub fn validate(value: Value, schema: &Schema) -> Result<Value, FieldError> {
  schema.check(&value)?;
  Ok(value)
}
