//! Mock steps and pool factories for testing.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{Flow, StepResult};
use crate::diagnostics::{self, DiagnosticSnapshot};
use crate::errors::StepflowError;
use crate::pool::{Job, PoolFactory, ScopedPoolFactory};
use crate::steps::Step;

#[derive(Debug, Default)]
struct JournalInner {
    entries: Vec<String>,
    diagnostics: Vec<(String, BTreeMap<String, String>)>,
}

/// A shared, ordered log of step calls.
///
/// Entries read `apply:NAME` or `reverse:NAME`. Cloning shares the log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    inner: Arc<Mutex<JournalInner>>,
}

impl Journal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every entry in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }

    /// Returns the names of applied steps in call order.
    #[must_use]
    pub fn applied(&self) -> Vec<String> {
        self.names_with("apply:")
    }

    /// Returns the names of reversed steps in call order.
    #[must_use]
    pub fn reversed(&self) -> Vec<String> {
        self.names_with("reverse:")
    }

    /// Returns the diagnostic map seen by each `apply` of `step`.
    #[must_use]
    pub fn diagnostics_of(&self, step: &str) -> Vec<BTreeMap<String, String>> {
        self.inner
            .lock()
            .diagnostics
            .iter()
            .filter(|(name, _)| name == step)
            .map(|(_, map)| map.clone())
            .collect()
    }

    fn names_with(&self, prefix: &str) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .filter_map(|entry| entry.strip_prefix(prefix))
            .map(String::from)
            .collect()
    }

    fn record_apply(&self, step: &str) {
        let mut inner = self.inner.lock();
        inner.entries.push(format!("apply:{step}"));
        inner
            .diagnostics
            .push((step.to_string(), diagnostics::current()));
    }

    fn record_reverse(&self, step: &str) {
        self.inner.lock().entries.push(format!("reverse:{step}"));
    }
}

/// A call counter that outlives the step it was taken from.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Returns the current count.
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
enum Behavior {
    Continue,
    Stop,
    Fail(String),
    Panic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReverseBehavior {
    Succeed,
    Fail,
    Panic,
}

/// A configurable step that writes every call to a [`Journal`].
///
/// Works with any context type.
#[derive(Debug)]
pub struct RecordingStep {
    name: String,
    journal: Journal,
    behavior: Behavior,
    reverse_behavior: ReverseBehavior,
    applicable: bool,
    delay: Option<Duration>,
    applies: CallCounter,
    reverses: CallCounter,
}

impl RecordingStep {
    /// Creates a step that continues.
    #[must_use]
    pub fn new(name: impl Into<String>, journal: &Journal) -> Self {
        Self {
            name: name.into(),
            journal: journal.clone(),
            behavior: Behavior::Continue,
            reverse_behavior: ReverseBehavior::Succeed,
            applicable: true,
            delay: None,
            applies: CallCounter::default(),
            reverses: CallCounter::default(),
        }
    }

    /// Makes `apply` return `Flow::Stop`.
    #[must_use]
    pub fn stopping(mut self) -> Self {
        self.behavior = Behavior::Stop;
        self
    }

    /// Makes `apply` fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior = Behavior::Fail(message.into());
        self
    }

    /// Makes `apply` panic.
    #[must_use]
    pub fn panicking(mut self) -> Self {
        self.behavior = Behavior::Panic;
        self
    }

    /// Makes `is_applicable` return false.
    #[must_use]
    pub fn inapplicable(mut self) -> Self {
        self.applicable = false;
        self
    }

    /// Makes `reverse` fail after recording the call.
    #[must_use]
    pub fn failing_reverse(mut self) -> Self {
        self.reverse_behavior = ReverseBehavior::Fail;
        self
    }

    /// Makes `reverse` panic after recording the call.
    #[must_use]
    pub fn panicking_reverse(mut self) -> Self {
        self.reverse_behavior = ReverseBehavior::Panic;
        self
    }

    /// Sleeps for `delay` at the start of every `apply`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns a handle to the number of `apply` calls.
    #[must_use]
    pub fn apply_counter(&self) -> CallCounter {
        self.applies.clone()
    }

    /// Returns a handle to the number of `reverse` calls.
    #[must_use]
    pub fn reverse_counter(&self) -> CallCounter {
        self.reverses.clone()
    }
}

impl<C: ?Sized> Step<C> for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, _ctx: &C) -> StepResult {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.applies.bump();
        self.journal.record_apply(&self.name);
        match &self.behavior {
            Behavior::Continue => Ok(Flow::Continue),
            Behavior::Stop => Ok(Flow::Stop),
            Behavior::Fail(message) => Err(anyhow::anyhow!("{message}")),
            Behavior::Panic => panic!("{} panicked", self.name),
        }
    }

    fn is_applicable(&self, _ctx: &C) -> bool {
        self.applicable
    }

    fn reverse(&self, _ctx: &C) -> anyhow::Result<()> {
        self.reverses.bump();
        self.journal.record_reverse(&self.name);
        match self.reverse_behavior {
            ReverseBehavior::Succeed => Ok(()),
            ReverseBehavior::Fail => anyhow::bail!("{} could not be reversed", self.name),
            ReverseBehavior::Panic => panic!("{} panicked while reversing", self.name),
        }
    }
}

/// A [`PoolFactory`] that counts the pools it creates.
pub struct CountingPoolFactory {
    inner: Arc<dyn PoolFactory>,
    created: AtomicUsize,
    last_size: Mutex<Option<usize>>,
}

impl CountingPoolFactory {
    /// Wraps another factory.
    #[must_use]
    pub fn new(inner: Arc<dyn PoolFactory>) -> Self {
        Self {
            inner,
            created: AtomicUsize::new(0),
            last_size: Mutex::new(None),
        }
    }

    /// Returns the number of pools created so far.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Returns the size of the most recent pool.
    #[must_use]
    pub fn last_size(&self) -> Option<usize> {
        *self.last_size.lock()
    }
}

impl Default for CountingPoolFactory {
    fn default() -> Self {
        Self::new(Arc::new(ScopedPoolFactory::default()))
    }
}

impl std::fmt::Debug for CountingPoolFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingPoolFactory")
            .field("created", &self.created())
            .field("last_size", &self.last_size())
            .finish()
    }
}

impl PoolFactory for CountingPoolFactory {
    fn run_scoped<'scope>(
        &self,
        size: usize,
        diagnostics: &DiagnosticSnapshot,
        jobs: Vec<Job<'scope>>,
    ) -> Result<(), StepflowError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.last_size.lock() = Some(size);
        self.inner.run_scoped(size, diagnostics, jobs)
    }
}
