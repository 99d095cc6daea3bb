//! Fork-join execution of sibling steps.
//!
//! A [`ConcurrentStage`] behaves as a single step whose `apply` fans out to
//! its applicable sub-steps and fans back in once every one of them has
//! finished. Partial success among siblings is reversed before a failure or
//! stop reaches the parent.

use super::compensation::compensate;
use crate::config::PoolConfig;
use crate::core::{Flow, StepOutcome, StepResult};
use crate::diagnostics::DiagnosticSnapshot;
use crate::errors::StepflowError;
use crate::events::{get_event_sink, EventSink, STEP_FAILED};
use crate::pool::{Job, PoolFactory, ScopedPoolFactory, WorkerPool};
use crate::steps::{invoke_apply, invoke_is_applicable, Step};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info_span};

/// Where dispatched sub-steps run.
enum Executor {
    /// A long-lived pool supplied by the caller.
    Shared(Arc<dyn WorkerPool>),
    /// A fresh pool per dispatch, sized to the number of jobs.
    Transient(Arc<dyn PoolFactory>),
}

impl Default for Executor {
    fn default() -> Self {
        Self::Transient(Arc::new(ScopedPoolFactory::default()))
    }
}

/// A set of sub-steps executed concurrently as one step.
pub struct ConcurrentStage<C: ?Sized> {
    name: String,
    steps: Vec<Arc<dyn Step<C>>>,
    executor: Executor,
    event_sink: Arc<dyn EventSink>,
}

impl<C: ?Sized> ConcurrentStage<C> {
    /// Creates a stage that runs on transient pools with default settings.
    pub fn new(name: impl Into<String>, steps: Vec<Arc<dyn Step<C>>>) -> Self {
        Self {
            name: name.into(),
            steps,
            executor: Executor::default(),
            event_sink: get_event_sink(),
        }
    }

    /// Appends a sub-step.
    #[must_use]
    pub fn step<S>(mut self, step: S) -> Self
    where
        S: Step<C> + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Runs dispatched sub-steps on transient pools built from `config`.
    #[must_use]
    pub fn with_config(self, config: PoolConfig) -> Self {
        self.with_pool_factory(Arc::new(ScopedPoolFactory::new(config)))
    }

    /// Runs dispatched sub-steps on a caller-supplied pool.
    #[must_use]
    pub fn with_pool(mut self, pool: Arc<dyn WorkerPool>) -> Self {
        self.executor = Executor::Shared(pool);
        self
    }

    /// Runs dispatched sub-steps on transient pools from `factory`.
    #[must_use]
    pub fn with_pool_factory(mut self, factory: Arc<dyn PoolFactory>) -> Self {
        self.executor = Executor::Transient(factory);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the sub-steps in declaration order.
    #[must_use]
    pub fn sub_steps(&self) -> &[Arc<dyn Step<C>>] {
        &self.steps
    }

    /// Returns the applicable sub-steps, or the first predicate panic.
    fn applicable(&self, ctx: &C) -> anyhow::Result<Vec<&dyn Step<C>>> {
        let mut steps = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            if invoke_is_applicable(step.as_ref(), ctx)? {
                steps.push(step.as_ref());
            }
        }
        Ok(steps)
    }
}

impl<C: ?Sized + Sync> ConcurrentStage<C> {
    /// Runs every step as its own job and returns the outcomes in dispatch
    /// order.
    ///
    /// A job that never reported back counts as failed. The first such job
    /// carries the pool's error when the pool itself failed.
    fn dispatch(&self, steps: &[&dyn Step<C>], ctx: &C) -> Vec<StepOutcome> {
        let snapshot = DiagnosticSnapshot::capture();
        let slots: Vec<Mutex<Option<StepOutcome>>> =
            steps.iter().map(|_| Mutex::new(None)).collect();
        let shared = matches!(self.executor, Executor::Shared(_));
        let (stage, sink) = (self.name.as_str(), self.event_sink.as_ref());

        let jobs: Vec<Job<'_>> = steps
            .iter()
            .zip(&slots)
            .map(|(&step, slot)| {
                let snapshot = snapshot.clone();
                Box::new(move || {
                    let _scope = shared.then(|| snapshot.enter());
                    let span = info_span!(
                        "step",
                        stage = %stage,
                        step = %step.name(),
                        diagnostics = %snapshot
                    );
                    let _entered = span.enter();

                    let outcome = invoke_apply(step, ctx);
                    if let StepOutcome::Failed(err) = &outcome {
                        error!(error = %err, "Concurrent step failed");
                        sink.try_emit(
                            STEP_FAILED,
                            Some(serde_json::json!({
                                "stage": stage,
                                "step": step.name(),
                                "error": err.to_string(),
                            })),
                        );
                    }
                    *slot.lock() = Some(outcome);
                }) as Job<'_>
            })
            .collect();

        let mut pool_error = match &self.executor {
            Executor::Shared(pool) => {
                debug!(stage = %self.name, jobs = jobs.len(), "Dispatching to shared pool");
                pool.run_all(jobs);
                None
            }
            Executor::Transient(factory) => {
                debug!(stage = %self.name, jobs = jobs.len(), "Dispatching to transient pool");
                factory.run_scoped(steps.len(), &snapshot, jobs).err()
            }
        };
        if let Some(err) = &pool_error {
            error!(stage = %self.name, error = %err, "Worker pool failed");
        }

        slots
            .into_iter()
            .zip(steps)
            .map(|(slot, step)| {
                slot.into_inner().unwrap_or_else(|| {
                    let err = pool_error.take().unwrap_or_else(|| {
                        StepflowError::Internal(format!(
                            "step '{}' of stage '{}' produced no outcome",
                            step.name(),
                            self.name
                        ))
                    });
                    StepOutcome::Failed(err.into())
                })
            })
            .collect()
    }

    /// Reduces sibling outcomes to the stage's result, reversing the
    /// siblings that continued when the stage does not.
    fn reduce(&self, steps: &[&dyn Step<C>], outcomes: Vec<StepOutcome>, ctx: &C) -> StepResult {
        let succeeded: Vec<&dyn Step<C>> = steps
            .iter()
            .zip(&outcomes)
            .rev()
            .filter(|(_, outcome)| outcome.is_continue())
            .map(|(&step, _)| step)
            .collect();
        let stopped = outcomes.iter().any(StepOutcome::is_stop);
        let failure = outcomes.into_iter().find_map(|outcome| match outcome {
            StepOutcome::Failed(err) => Some(err),
            _ => None,
        });

        if failure.is_none() && !stopped {
            return Ok(Flow::Continue);
        }

        if !succeeded.is_empty() {
            debug!(
                stage = %self.name,
                steps = succeeded.len(),
                "Reversing concurrent siblings"
            );
            compensate(&succeeded, ctx, self.event_sink.as_ref());
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(Flow::Stop),
        }
    }
}

impl<C: ?Sized> fmt::Debug for ConcurrentStage<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let executor = match self.executor {
            Executor::Shared(_) => "shared",
            Executor::Transient(_) => "transient",
        };
        f.debug_struct("ConcurrentStage")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("executor", &executor)
            .finish()
    }
}

impl<C: ?Sized + Sync> Step<C> for ConcurrentStage<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &C) -> StepResult {
        let steps = self.applicable(ctx)?;
        match steps.as_slice() {
            [] => Ok(Flow::Continue),
            [only] => {
                debug!(stage = %self.name, step = %only.name(), "Running single step inline");
                invoke_apply(*only, ctx).into_result()
            }
            _ => {
                let outcomes = self.dispatch(&steps, ctx);
                self.reduce(&steps, outcomes, ctx)
            }
        }
    }

    fn is_applicable(&self, ctx: &C) -> bool {
        self.steps.iter().any(|step| step.is_applicable(ctx))
    }

    fn reverse(&self, ctx: &C) -> anyhow::Result<()> {
        let steps: Vec<&dyn Step<C>> = self
            .steps
            .iter()
            .filter(|step| matches!(invoke_is_applicable(step.as_ref(), ctx), Ok(true)))
            .map(AsRef::as_ref)
            .collect();
        compensate(&steps, ctx, self.event_sink.as_ref());
        Ok(())
    }
}
