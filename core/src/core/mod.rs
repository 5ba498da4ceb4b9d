pub mod outcome;
pub mod step;
pub mod value;

// Re-export key types for easier access from other modules (and lib.rs)
pub use outcome::{ErrorEntry, Failure, Invalid, Metrics, RunOutcome, ValidationOutcome};
pub use step::{StepDef, StepFn, ValidatorFn};
pub use value::{Handle, HandleKind, Record, TypeTag, Value};
