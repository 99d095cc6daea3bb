//! Event sink system for observability.
//!
//! This module provides the event emission infrastructure used by pipelines
//! and concurrent stages for logging, monitoring, and analytics.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use parking_lot::RwLock;
use std::sync::Arc;

/// Event emitted once per pipeline run.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Event emitted for every error raised inside a worker.
pub const STEP_FAILED: &str = "step.failed";
/// Event emitted for every swallowed compensation error.
pub const STEP_REVERSE_FAILED: &str = "step.reverse_failed";

static GLOBAL_EVENT_SINK: RwLock<Option<Arc<dyn EventSink>>> = RwLock::new(None);

/// Sets the current global event sink.
///
/// Pipelines and stages pick up the global sink when they are built.
pub fn set_event_sink(sink: Arc<dyn EventSink>) {
    *GLOBAL_EVENT_SINK.write() = Some(sink);
}

/// Clears the current global event sink.
pub fn clear_event_sink() {
    *GLOBAL_EVENT_SINK.write() = None;
}

/// Gets the current global event sink.
///
/// Returns a `NoOpEventSink` if no sink is set.
pub fn get_event_sink() -> Arc<dyn EventSink> {
    GLOBAL_EVENT_SINK
        .read()
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpEventSink))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_sink_roundtrip() {
        clear_event_sink();
        // Should be a NoOpEventSink (we can't directly check type, but it shouldn't panic)
        get_event_sink().try_emit("test", None);

        let sink = Arc::new(CollectingEventSink::new());
        set_event_sink(sink.clone());
        get_event_sink().try_emit("test.event", Some(serde_json::json!({"key": "value"})));
        clear_event_sink();

        assert_eq!(sink.events_of_type("test.event").len(), 1);
    }
}
