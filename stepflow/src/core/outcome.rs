//! Step outcomes.

use std::fmt;

/// The value a step returns from a successful `apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flow {
    /// Proceed with the rest of the pipeline.
    Continue,
    /// Stop the pipeline. This is not an error, but it still triggers
    /// compensation of the work done so far.
    Stop,
}

impl Flow {
    /// Maps a boolean "proceed" flag onto a flow signal.
    #[must_use]
    pub fn proceed_if(proceed: bool) -> Self {
        if proceed {
            Self::Continue
        } else {
            Self::Stop
        }
    }
}

/// The result of a step's `apply`.
pub type StepResult = Result<Flow, anyhow::Error>;

/// The resolved outcome of a single step invocation.
///
/// Failures are carried as values so that concurrent siblings can be
/// reduced after all of them have finished.
#[derive(Debug)]
pub enum StepOutcome {
    /// The step succeeded and the pipeline may proceed.
    Continue,
    /// The step asked the pipeline to stop.
    Stop,
    /// The step raised an error.
    Failed(anyhow::Error),
}

impl StepOutcome {
    /// Returns true if the step succeeded.
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Returns true if the step asked to stop.
    #[must_use]
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }

    /// Returns true if the step failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Converts back into the result shape returned by `apply`.
    pub fn into_result(self) -> StepResult {
        match self {
            Self::Continue => Ok(Flow::Continue),
            Self::Stop => Ok(Flow::Stop),
            Self::Failed(err) => Err(err),
        }
    }
}

impl From<StepResult> for StepOutcome {
    fn from(result: StepResult) -> Self {
        match result {
            Ok(Flow::Continue) => Self::Continue,
            Ok(Flow::Stop) => Self::Stop,
            Err(err) => Self::Failed(err),
        }
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Continue => write!(f, "continue"),
            Self::Stop => write!(f, "stop"),
            Self::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_proceed_if() {
        assert_eq!(Flow::proceed_if(true), Flow::Continue);
        assert_eq!(Flow::proceed_if(false), Flow::Stop);
    }

    #[test]
    fn test_outcome_from_result() {
        assert!(StepOutcome::from(Ok(Flow::Continue)).is_continue());
        assert!(StepOutcome::from(Ok(Flow::Stop)).is_stop());
        assert!(StepOutcome::from(Err(anyhow::anyhow!("boom"))).is_failed());
    }

    #[test]
    fn test_outcome_into_result_keeps_error() {
        let outcome = StepOutcome::Failed(anyhow::anyhow!("disk full"));
        let err = outcome.into_result().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(StepOutcome::Continue.to_string(), "continue");
        assert_eq!(StepOutcome::Stop.to_string(), "stop");
        assert_eq!(
            StepOutcome::Failed(anyhow::anyhow!("boom")).to_string(),
            "failed: boom"
        );
    }
}
