//! Sequential pipeline execution.
//!
//! Runs steps strictly in list order on the calling thread. A step that
//! returns [`Flow::Stop`] turns the rest of the run into a no-op; a step that
//! fails aborts it. Either way, every step that succeeded in this run is
//! reversed, newest first, before the pipeline returns.

use super::compensation::compensate;
use super::report::PipelineReport;
use crate::core::{ExecutionStatus, Flow, StepExecutionInfo, StepOutcome, StepResult};
use crate::errors::StepflowError;
use crate::events::{get_event_sink, EventSink, PIPELINE_COMPLETED};
use crate::steps::{invoke_apply, invoke_is_applicable, Step};
use chrono::Utc;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// An ordered list of steps executed one at a time.
pub struct Pipeline<C: ?Sized> {
    /// The pipeline name.
    name: String,
    /// Steps in execution order.
    steps: Vec<Arc<dyn Step<C>>>,
    /// Sink for the per-run summary and compensation failures.
    event_sink: Arc<dyn EventSink>,
}

impl<C: ?Sized> Pipeline<C> {
    /// Creates an empty pipeline.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_steps(name, Vec::new())
    }

    /// Creates a pipeline from a list of steps.
    pub fn with_steps(name: impl Into<String>, steps: Vec<Arc<dyn Step<C>>>) -> Self {
        Self {
            name: name.into(),
            steps,
            event_sink: get_event_sink(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn step<S>(mut self, step: S) -> Self
    where
        S: Step<C> + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Appends an already shared step.
    #[must_use]
    pub fn shared_step(mut self, step: Arc<dyn Step<C>>) -> Self {
        self.steps.push(step);
        self
    }

    /// Appends steps to an existing pipeline.
    pub fn add_steps(&mut self, steps: impl IntoIterator<Item = Arc<dyn Step<C>>>) {
        self.steps.extend(steps);
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[Arc<dyn Step<C>>] {
        &self.steps
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the pipeline has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Executes the pipeline against `ctx`.
    ///
    /// # Returns
    ///
    /// * `Ok(report)` with status `Success` - every applicable step continued
    /// * `Ok(report)` with status `Skipped` - a step stopped the run; earlier
    ///   successes have been reversed
    /// * `Err(_)` - a step failed; earlier successes have been reversed and
    ///   the step's error is the source of the returned error
    pub fn execute(&self, ctx: &C) -> Result<PipelineReport, StepflowError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let mut status = ExecutionStatus::Success;
        let mut records: VecDeque<StepExecutionInfo> = VecDeque::with_capacity(self.steps.len());
        let mut failure = None;

        for (index, step) in self.steps.iter().enumerate() {
            if status == ExecutionStatus::Skipped {
                records.push_front(StepExecutionInfo::skipped(index, step.name()));
                continue;
            }

            let step_start = Instant::now();
            let outcome = match invoke_is_applicable(step.as_ref(), ctx) {
                Ok(true) => invoke_apply(step.as_ref(), ctx),
                Ok(false) => {
                    records.push_front(StepExecutionInfo::skipped(index, step.name()));
                    continue;
                }
                Err(err) => StepOutcome::Failed(err),
            };
            let elapsed = step_start.elapsed();

            match outcome {
                StepOutcome::Continue => {
                    records.push_front(StepExecutionInfo::new(
                        index,
                        step.name(),
                        elapsed,
                        ExecutionStatus::Success,
                    ));
                }
                StepOutcome::Stop => {
                    info!(
                        pipeline = %self.name,
                        step = %step.name(),
                        "Step resulted in skip of remaining pipeline execution"
                    );
                    status = ExecutionStatus::Skipped;
                    records.push_front(StepExecutionInfo::new(
                        index,
                        step.name(),
                        elapsed,
                        ExecutionStatus::Skipped,
                    ));
                }
                StepOutcome::Failed(err) => {
                    warn!(
                        pipeline = %self.name,
                        step = %step.name(),
                        error = %err,
                        "Pipeline step failed"
                    );
                    status = ExecutionStatus::Failed;
                    records.push_front(StepExecutionInfo::new(
                        index,
                        step.name(),
                        elapsed,
                        ExecutionStatus::Failed,
                    ));
                    failure = Some(step_error(step.name(), err));
                    break;
                }
            }
        }

        if status != ExecutionStatus::Success {
            self.rollback(&records, ctx);
        }

        let report = PipelineReport {
            pipeline: self.name.clone(),
            run_id,
            started_at,
            status,
            elapsed: start.elapsed(),
            steps: records.into(),
        };
        self.emit_summary(&report);

        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Reverses every step recorded as a success, newest first.
    fn rollback(&self, records: &VecDeque<StepExecutionInfo>, ctx: &C) {
        let succeeded: Vec<&dyn Step<C>> = records
            .iter()
            .filter(|record| record.status.is_success())
            .filter_map(|record| self.steps.get(record.index))
            .map(AsRef::as_ref)
            .collect();
        if succeeded.is_empty() {
            return;
        }

        info!(
            pipeline = %self.name,
            steps = succeeded.len(),
            "Rolling back previous successful steps"
        );
        compensate(&succeeded, ctx, self.event_sink.as_ref());
    }

    fn emit_summary(&self, report: &PipelineReport) {
        info!(
            pipeline = %report.pipeline,
            run_id = %report.run_id,
            status = %report.status,
            elapsed_ms = report.elapsed_ms(),
            steps = %report.steps_info(),
            "Pipeline execution finished"
        );
        self.event_sink
            .try_emit(PIPELINE_COMPLETED, report.to_event_payload());
    }
}

/// Wraps an error raised by a step, leaving the step's own panic as is.
fn step_error(step: &str, err: anyhow::Error) -> StepflowError {
    let own_panic = matches!(
        err.downcast_ref::<StepflowError>(),
        Some(StepflowError::StepPanicked { step: panicked, .. }) if panicked == step
    );
    if !own_panic {
        return StepflowError::step_failed(step, err);
    }
    match err.downcast::<StepflowError>() {
        Ok(panic) => panic,
        Err(err) => StepflowError::step_failed(step, err),
    }
}

impl<C: ?Sized> fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A pipeline can run as a single step of another pipeline or stage.
///
/// By the time a nested run reports a stop or a failure it has already
/// reversed its own work.
impl<C: ?Sized> Step<C> for Pipeline<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &C) -> StepResult {
        let report = self.execute(ctx)?;
        Ok(Flow::proceed_if(report.is_success()))
    }

    fn is_applicable(&self, ctx: &C) -> bool {
        self.steps.iter().any(|step| step.is_applicable(ctx))
    }

    fn reverse(&self, ctx: &C) -> anyhow::Result<()> {
        let applicable: Vec<&dyn Step<C>> = self
            .steps
            .iter()
            .rev()
            .filter(|step| matches!(invoke_is_applicable(step.as_ref(), ctx), Ok(true)))
            .map(AsRef::as_ref)
            .collect();
        compensate(&applicable, ctx, self.event_sink.as_ref());
        Ok(())
    }
}
