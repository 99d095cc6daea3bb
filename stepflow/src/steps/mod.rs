//! Step trait and simple implementations.
//!
//! Steps are the fundamental units of work in a stepflow pipeline. A step
//! receives the caller's context by shared reference; any state it changes
//! lives behind interior mutability owned by the caller.

use crate::core::{Flow, StepOutcome, StepResult};
use crate::errors::StepflowError;
use std::fmt::Debug;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Trait for pipeline steps.
///
/// `C` is the execution context shared by every step of one run. Steps that
/// take part in a concurrent stage see the same context from several threads
/// at once, so the context type must be `Sync` there.
pub trait Step<C: ?Sized>: Send + Sync {
    /// Returns the name of the step.
    ///
    /// Defaults to the short type name of the implementor.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Executes the step.
    ///
    /// # Returns
    ///
    /// * `Ok(Flow::Continue)` - proceed with the pipeline
    /// * `Ok(Flow::Stop)` - stop the pipeline without raising an error
    /// * `Err(_)` - the step failed
    fn apply(&self, ctx: &C) -> StepResult;

    /// Returns whether the step should run for this context.
    fn is_applicable(&self, _ctx: &C) -> bool {
        true
    }

    /// Undoes the effects of a previous successful `apply`.
    ///
    /// Errors are logged by the engine and never propagated.
    fn reverse(&self, _ctx: &C) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Strips the module path and generic arguments from a type name.
#[must_use]
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Runs a step's `apply`, turning a panic into a failed outcome.
pub fn invoke_apply<C: ?Sized>(step: &dyn Step<C>, ctx: &C) -> StepOutcome {
    match catch_unwind(AssertUnwindSafe(|| step.apply(ctx))) {
        Ok(result) => StepOutcome::from(result),
        Err(payload) => StepOutcome::Failed(
            StepflowError::step_panicked(step.name(), payload.as_ref()).into(),
        ),
    }
}

/// Runs a step's `is_applicable`, turning a panic into an error.
pub fn invoke_is_applicable<C: ?Sized>(step: &dyn Step<C>, ctx: &C) -> anyhow::Result<bool> {
    catch_unwind(AssertUnwindSafe(|| step.is_applicable(ctx)))
        .map_err(|payload| StepflowError::step_panicked(step.name(), payload.as_ref()).into())
}

/// Runs a step's `reverse`, turning a panic into an error.
pub fn invoke_reverse<C: ?Sized>(step: &dyn Step<C>, ctx: &C) -> anyhow::Result<()> {
    match catch_unwind(AssertUnwindSafe(|| step.reverse(ctx))) {
        Ok(result) => result,
        Err(payload) => Err(StepflowError::step_panicked(step.name(), payload.as_ref()).into()),
    }
}

/// A closure-based step.
pub struct FnStep<C: ?Sized> {
    name: String,
    apply: Box<dyn Fn(&C) -> StepResult + Send + Sync>,
    reverse: Option<Box<dyn Fn(&C) -> anyhow::Result<()> + Send + Sync>>,
    applicable: Option<Box<dyn Fn(&C) -> bool + Send + Sync>>,
}

impl<C: ?Sized> FnStep<C> {
    /// Creates a new closure-based step.
    pub fn new<F>(name: impl Into<String>, apply: F) -> Self
    where
        F: Fn(&C) -> StepResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            apply: Box::new(apply),
            reverse: None,
            applicable: None,
        }
    }

    /// Sets the compensating action.
    #[must_use]
    pub fn with_reverse<F>(mut self, reverse: F) -> Self
    where
        F: Fn(&C) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.reverse = Some(Box::new(reverse));
        self
    }

    /// Sets the applicability predicate.
    #[must_use]
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&C) -> bool + Send + Sync + 'static,
    {
        self.applicable = Some(Box::new(predicate));
        self
    }
}

impl<C: ?Sized> Debug for FnStep<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("name", &self.name)
            .field("has_reverse", &self.reverse.is_some())
            .finish()
    }
}

impl<C: ?Sized> Step<C> for FnStep<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, ctx: &C) -> StepResult {
        (self.apply)(ctx)
    }

    fn is_applicable(&self, ctx: &C) -> bool {
        self.applicable.as_ref().map_or(true, |predicate| predicate(ctx))
    }

    fn reverse(&self, ctx: &C) -> anyhow::Result<()> {
        self.reverse.as_ref().map_or(Ok(()), |reverse| reverse(ctx))
    }
}

/// A no-op step that always continues.
#[derive(Debug, Clone)]
pub struct NoOpStep {
    name: String,
}

impl NoOpStep {
    /// Creates a new no-op step.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<C: ?Sized> Step<C> for NoOpStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, _ctx: &C) -> StepResult {
        Ok(Flow::Continue)
    }
}
