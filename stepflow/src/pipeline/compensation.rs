//! Best-effort compensation sweeps.

use crate::events::{EventSink, STEP_REVERSE_FAILED};
use crate::steps::{invoke_reverse, Step};
use tracing::{debug, error};

/// Calls `reverse` on every step, in the given order.
///
/// Errors and panics raised by `reverse` are logged, emitted as
/// `step.reverse_failed` and swallowed; the sweep always reaches the last
/// step. Returns the number of steps whose `reverse` failed.
pub fn compensate<C: ?Sized>(steps: &[&dyn Step<C>], ctx: &C, sink: &dyn EventSink) -> usize {
    let mut failures = 0;
    for step in steps {
        match invoke_reverse(*step, ctx) {
            Ok(()) => debug!(step = %step.name(), "Step reversed"),
            Err(err) => {
                failures += 1;
                error!(
                    step = %step.name(),
                    error = %err,
                    "Unable to reverse step, skipping to next"
                );
                sink.try_emit(
                    STEP_REVERSE_FAILED,
                    Some(serde_json::json!({
                        "step": step.name(),
                        "error": err.to_string(),
                    })),
                );
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::testing::{Journal, RecordingStep};

    #[test]
    fn test_compensate_in_given_order() {
        let journal = Journal::new();
        let a = RecordingStep::new("a", &journal);
        let b = RecordingStep::new("b", &journal);
        let sink = CollectingEventSink::new();

        let failures = compensate::<()>(&[&b, &a], &(), &sink);

        assert_eq!(failures, 0);
        assert_eq!(journal.entries(), vec!["reverse:b", "reverse:a"]);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_compensate_continues_past_errors_and_panics() {
        let journal = Journal::new();
        let a = RecordingStep::new("a", &journal).failing_reverse();
        let b = RecordingStep::new("b", &journal).panicking_reverse();
        let c = RecordingStep::new("c", &journal);
        let sink = CollectingEventSink::new();

        let failures = compensate::<()>(&[&a, &b, &c], &(), &sink);

        assert_eq!(failures, 2);
        assert_eq!(journal.entries(), vec!["reverse:a", "reverse:b", "reverse:c"]);

        let events = sink.events_of_type(STEP_REVERSE_FAILED);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].1.as_ref().unwrap()["step"], "a");
        assert_eq!(events[1].1.as_ref().unwrap()["step"], "b");
    }

    #[test]
    fn test_compensate_nothing() {
        let sink = CollectingEventSink::new();
        assert_eq!(compensate::<()>(&[], &(), &sink), 0);
    }
}
