// pipewright/src/pipeline/mod.rs

//! Defines the `Pipeline` struct, its construction, run options, and execution logic.

pub mod definition;
pub mod execution;
pub mod options;

// Re-export the main Pipeline struct
pub use definition::{Pipeline, PipelineBuilder};
pub use options::{ErrorStrategy, RunOptions};
