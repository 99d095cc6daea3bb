//! Tracing subscriber setup.

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::StepflowError;
use tracing_subscriber::EnvFilter;

/// Default filter directive when neither the config nor `RUST_LOG` sets one.
pub const DEFAULT_FILTER: &str = "info";

/// Builds the `EnvFilter` for a logging configuration.
///
/// The configured filter wins, then `RUST_LOG`, then [`DEFAULT_FILTER`].
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, StepflowError> {
    match config.filter.as_deref() {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| StepflowError::Config(format!("Invalid log filter '{directives}': {e}"))),
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))),
    }
}

/// Installs a global `tracing` subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), StepflowError> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(config.with_thread_names);

    let result = match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| StepflowError::Logging(e.to_string()))
}
