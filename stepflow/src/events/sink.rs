//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn, Level};

/// Trait for event sinks that receive engine events.
///
/// Pipelines emit one `pipeline.completed` event per run, concurrent stages
/// emit `step.failed` for every error raised inside a worker, and the
/// compensation sweep emits `step.reverse_failed` for every error it swallows.
pub trait EventSink: Send + Sync {
    /// Emits an event without blocking.
    ///
    /// This method should never panic. Errors are logged but suppressed.
    ///
    /// # Arguments
    ///
    /// * `event_type` - The type of event (e.g., "pipeline.completed")
    /// * `data` - Optional event data
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event_type: &str, _data: Option<serde_json::Value>) {
        // Intentionally empty - discards all events
    }
}

/// An event sink that logs events using the tracing framework.
///
/// Failure events (`*.failed`, `*_failed`) are logged at `WARN`, or at `ERROR`
/// when the sink is configured at `ERROR`; every other event uses the
/// configured level.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// The log level for non-failure events.
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates an info-level logging sink.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    /// Returns the level an event is logged at.
    #[must_use]
    pub fn level_for(&self, event_type: &str) -> Level {
        if event_type.ends_with("failed") && self.level != Level::ERROR {
            Level::WARN
        } else {
            self.level
        }
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        let data = data.unwrap_or(serde_json::Value::Null);
        match self.level_for(event_type) {
            Level::TRACE => {
                trace!(event_type, event_data = %data, "Event: {event_type}");
            }
            Level::DEBUG => {
                debug!(event_type, event_data = %data, "Event: {event_type}");
            }
            Level::INFO => {
                info!(event_type, event_data = %data, "Event: {event_type}");
            }
            Level::WARN => {
                warn!(event_type, event_data = %data, "Event: {event_type}");
            }
            _ => {
                error!(event_type, event_data = %data, "Event: {event_type}");
            }
        }
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<(String, Option<serde_json::Value>)>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<serde_json::Value>)> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<(String, Option<serde_json::Value>)> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

impl CollectingEventSink {
    /// Returns the payloads of every event of exactly `event_type`, in
    /// emission order. Events without a payload are left out.
    #[must_use]
    pub fn payloads_of(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.events
            .read()
            .iter()
            .filter(|(t, _)| t == event_type)
            .filter_map(|(_, data)| data.clone())
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push((event_type.to_string(), data));
    }
}
