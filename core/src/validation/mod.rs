// pipewright/src/validation/mod.rs

//! Stateless, pure validation: per-field schemas and batch partitioning helpers.

pub mod batch;
pub mod schema;

pub use schema::{
  custom, of_type, required, validate, FieldError, FieldValidator, OfType, Required, Schema, REQUIRED_MESSAGE,
};
