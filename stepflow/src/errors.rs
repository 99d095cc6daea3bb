//! Error types for the stepflow engine.
//!
//! Steps raise `anyhow::Error` so callers can use any error type they like.
//! The engine wraps those in [`StepflowError`] when they surface from a
//! pipeline run, keeping the original error reachable as the source.

use thiserror::Error;

/// The main error type for stepflow operations.
#[derive(Debug, Error)]
pub enum StepflowError {
    /// A step's `apply` returned an error.
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        /// Name of the failing step.
        step: String,
        /// The error raised by the step.
        #[source]
        source: anyhow::Error,
    },

    /// A step panicked inside `apply`.
    #[error("Step '{step}' panicked: {message}")]
    StepPanicked {
        /// Name of the panicking step.
        step: String,
        /// The panic payload, rendered as text.
        message: String,
    },

    /// A transient worker pool could not be built.
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The global tracing subscriber could not be installed.
    #[error("Logging error: {0}")]
    Logging(String),

    /// A generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StepflowError {
    /// Wraps an error raised by a step.
    pub fn step_failed(step: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::StepFailed {
            step: step.into(),
            source: source.into(),
        }
    }

    /// Builds a panic error from a caught panic payload.
    pub fn step_panicked(step: impl Into<String>, payload: &(dyn std::any::Any + Send)) -> Self {
        Self::StepPanicked {
            step: step.into(),
            message: panic_message(payload),
        }
    }

    /// Returns the name of the step this error originated from, if any.
    #[must_use]
    pub fn step_name(&self) -> Option<&str> {
        match self {
            Self::StepFailed { step, .. } | Self::StepPanicked { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Returns true if this error was produced by a step rather than the engine.
    #[must_use]
    pub fn is_step_error(&self) -> bool {
        self.step_name().is_some()
    }
}

impl From<serde_json::Error> for StepflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rayon::ThreadPoolBuildError> for StepflowError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::WorkerPool(err.to_string())
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
