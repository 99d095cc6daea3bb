//! Execution status for steps and pipelines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The execution status of a step or of a whole pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Completed successfully.
    Success,
    /// Not run, or asked the pipeline to stop.
    Skipped,
    /// Raised an error.
    Failed,
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        Self::Success
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl ExecutionStatus {
    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if the status indicates the work was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_status_display() {
        assert_eq!(ExecutionStatus::Success.to_string(), "success");
        assert_eq!(ExecutionStatus::Skipped.to_string(), "skipped");
        assert_eq!(ExecutionStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_execution_status_default() {
        assert_eq!(ExecutionStatus::default(), ExecutionStatus::Success);
    }

    #[test]
    fn test_execution_status_predicates() {
        assert!(ExecutionStatus::Success.is_success());
        assert!(ExecutionStatus::Skipped.is_skipped());
        assert!(ExecutionStatus::Failed.is_failure());
        assert!(!ExecutionStatus::Skipped.is_failure());
    }

    #[test]
    fn test_execution_status_serialize() {
        let json = serde_json::to_string(&ExecutionStatus::Skipped).unwrap();
        assert_eq!(json, r#""skipped""#);

        let deserialized: ExecutionStatus = serde_json::from_str(r#""failed""#).unwrap();
        assert_eq!(deserialized, ExecutionStatus::Failed);
    }
}
