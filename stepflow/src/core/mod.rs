//! Core domain model types for stepflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - The tri-valued step outcome and the `Flow` signal returned by `apply`
//! - Execution status for steps and pipelines
//! - Per-step execution records

mod outcome;
mod record;
mod status;

pub use outcome::{Flow, StepOutcome, StepResult};
pub use record::StepExecutionInfo;
pub use status::ExecutionStatus;
