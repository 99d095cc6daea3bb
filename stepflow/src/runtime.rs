//! Running pipelines from async code.
//!
//! Pipelines block the calling thread, so async callers hand them to tokio's
//! blocking pool. The caller's diagnostic context travels with the run.

use crate::diagnostics::DiagnosticSnapshot;
use crate::errors::StepflowError;
use crate::pipeline::{Pipeline, PipelineReport};
use std::sync::Arc;
use tracing::debug;

/// Executes `pipeline` on tokio's blocking pool and awaits the report.
///
/// The diagnostic context of the calling thread is installed on the blocking
/// thread for the duration of the run and the thread's previous context is
/// restored afterwards.
pub async fn execute_blocking<C>(
    pipeline: Arc<Pipeline<C>>,
    ctx: Arc<C>,
) -> Result<PipelineReport, StepflowError>
where
    C: ?Sized + Send + Sync + 'static,
{
    let snapshot = DiagnosticSnapshot::capture();
    debug!(pipeline = %pipeline.name(), "Handing pipeline to blocking pool");

    tokio::task::spawn_blocking(move || {
        let _scope = snapshot.enter();
        pipeline.execute(ctx.as_ref())
    })
    .await
    .map_err(|e| StepflowError::Internal(format!("Blocking pipeline task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;
    use crate::pipeline::ConcurrentStage;
    use crate::testing::{assert_reversed_in_order, Journal, RecordingStep};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_execute_blocking_success() {
        let journal = Journal::new();
        let pipeline = Arc::new(
            Pipeline::new("async")
                .step(RecordingStep::new("a", &journal))
                .step(RecordingStep::new("b", &journal)),
        );

        let report = execute_blocking(pipeline, Arc::new(())).await.unwrap();

        assert!(report.is_success());
        assert_eq!(journal.applied(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_execute_blocking_failure_compensates() {
        let journal = Journal::new();
        let pipeline = Arc::new(
            Pipeline::new("async_fail")
                .step(RecordingStep::new("a", &journal))
                .step(RecordingStep::new("b", &journal).failing("boom")),
        );

        let err = execute_blocking(pipeline, Arc::new(())).await.unwrap_err();

        assert_eq!(err.step_name(), Some("b"));
        assert_reversed_in_order(&journal, &["a"]);
    }

    #[tokio::test]
    async fn test_execute_blocking_propagates_diagnostics() {
        let journal = Journal::new();
        let stage: ConcurrentStage<()> = ConcurrentStage::new("fan_out", Vec::new())
            .step(RecordingStep::new("a", &journal))
            .step(RecordingStep::new("b", &journal));
        let pipeline = Arc::new(
            Pipeline::new("async_mdc")
                .step(RecordingStep::new("first", &journal))
                .step(stage),
        );

        diagnostics::clear();
        diagnostics::put("request_id", "r-async");
        execute_blocking(pipeline, Arc::new(())).await.unwrap();
        diagnostics::clear();

        let expected = BTreeMap::from([("request_id".to_string(), "r-async".to_string())]);
        for step in ["first", "a", "b"] {
            assert_eq!(journal.diagnostics_of(step), vec![expected.clone()]);
        }
    }
}
