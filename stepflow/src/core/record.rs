//! Per-step execution records.

use super::ExecutionStatus;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// A record of one step's execution within a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepExecutionInfo {
    /// Position of the step in its pipeline.
    pub index: usize,
    /// Step name.
    pub step: String,
    /// Time spent in `apply`. Zero for steps that were not invoked.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// Resulting status.
    pub status: ExecutionStatus,
}

impl StepExecutionInfo {
    /// Creates a new record.
    pub fn new(
        index: usize,
        step: impl Into<String>,
        elapsed: Duration,
        status: ExecutionStatus,
    ) -> Self {
        Self {
            index,
            step: step.into(),
            elapsed,
            status,
        }
    }

    /// Creates a record for a step that was never invoked.
    pub fn skipped(index: usize, step: impl Into<String>) -> Self {
        Self::new(index, step, Duration::ZERO, ExecutionStatus::Skipped)
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

impl fmt::Display for StepExecutionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{step={}, execution_time_ms={}, status={}}}",
            self.step,
            self.elapsed_ms(),
            self.status
        )
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}
