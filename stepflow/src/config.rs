//! Configuration types for worker pools and logging.

use crate::errors::StepflowError;
use serde::{Deserialize, Serialize};

/// Configuration for the worker pools created by concurrent stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Prefix for worker thread names. Workers are named `{prefix}-{index}`.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Stack size for worker threads in bytes. Uses the platform default when unset.
    #[serde(default)]
    pub stack_size: Option<usize>,
    /// Number of threads in a shared pool built with `build_shared_pool`.
    /// Uses rayon's default (one per CPU) when unset.
    #[serde(default)]
    pub shared_threads: Option<usize>,
}

fn default_thread_name_prefix() -> String {
    "stepflow-worker".to_string()
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size: None,
            shared_threads: None,
        }
    }
}

impl PoolConfig {
    /// Creates a new pool configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the worker stack size.
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Sets the shared pool size.
    #[must_use]
    pub fn with_shared_threads(mut self, threads: usize) -> Self {
        self.shared_threads = Some(threads);
        self
    }

    /// Returns the name of the worker at `index`.
    #[must_use]
    pub fn thread_name(&self, index: usize) -> String {
        format!("{}-{}", self.thread_name_prefix, index)
    }
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Configuration for the tracing subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive. Falls back to `RUST_LOG`, then `info`, when unset.
    #[serde(default)]
    pub filter: Option<String>,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Whether to include thread names in log lines.
    #[serde(default = "default_with_thread_names")]
    pub with_thread_names: bool,
}

fn default_with_thread_names() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            format: LogFormat::default(),
            with_thread_names: default_with_thread_names(),
        }
    }
}

impl LoggingConfig {
    /// Sets the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepflowConfig {
    /// Worker pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StepflowConfig {
    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, StepflowError> {
        serde_json::from_str(json).map_err(|e| StepflowError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pool_config_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.thread_name_prefix, "stepflow-worker");
        assert_eq!(config.stack_size, None);
        assert_eq!(config.thread_name(2), "stepflow-worker-2");
    }

    #[test]
    fn test_pool_config_builders() {
        let config = PoolConfig::new()
            .with_thread_name_prefix("checkout")
            .with_stack_size(4 * 1024 * 1024)
            .with_shared_threads(8);
        assert_eq!(config.thread_name(0), "checkout-0");
        assert_eq!(config.stack_size, Some(4 * 1024 * 1024));
        assert_eq!(config.shared_threads, Some(8));
    }

    #[test]
    fn test_config_from_empty_json() {
        let config = StepflowConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StepflowConfig::default());
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = StepflowConfig::from_json_str(
            r#"{"pool": {"thread_name_prefix": "orders"}, "logging": {"format": "json", "filter": "stepflow=debug"}}"#,
        )
        .unwrap();
        assert_eq!(config.pool.thread_name_prefix, "orders");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.filter.as_deref(), Some("stepflow=debug"));
        assert!(config.logging.with_thread_names);
    }

    #[test]
    fn test_config_invalid_json() {
        let err = StepflowConfig::from_json_str(r#"{"pool": 3}"#).unwrap_err();
        assert!(matches!(err, StepflowError::Config(_)));
    }
}
