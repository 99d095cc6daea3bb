//! Worker pools for concurrent stages.
//!
//! A concurrent stage either runs its jobs on a caller-supplied
//! [`WorkerPool`] or asks a [`PoolFactory`] for a transient pool that lives
//! for exactly one dispatch. Jobs may borrow from the caller's stack: both
//! seams only return once every job has finished.

use crate::config::PoolConfig;
use crate::diagnostics::{self, DiagnosticSnapshot};
use crate::errors::StepflowError;
use rayon::ThreadPoolBuilder;
use tracing::debug;

/// A unit of work dispatched to a pool.
pub type Job<'scope> = Box<dyn FnOnce() + Send + 'scope>;

/// A long-lived pool that concurrent stages can share.
pub trait WorkerPool: Send + Sync {
    /// Runs every job and returns once all of them have completed.
    fn run_all<'scope>(&self, jobs: Vec<Job<'scope>>);
}

impl WorkerPool for rayon::ThreadPool {
    fn run_all<'scope>(&self, jobs: Vec<Job<'scope>>) {
        self.scope(|scope| {
            for job in jobs {
                scope.spawn(move |_| job());
            }
        });
    }
}

/// Creates transient pools, one per dispatch.
pub trait PoolFactory: Send + Sync {
    /// Builds a pool of exactly `size` workers, runs every job on it and tears
    /// it down.
    ///
    /// Each worker installs a private copy of `diagnostics` when it starts and
    /// clears its diagnostic context when it exits. The call returns only
    /// after every worker thread has terminated.
    fn run_scoped<'scope>(
        &self,
        size: usize,
        diagnostics: &DiagnosticSnapshot,
        jobs: Vec<Job<'scope>>,
    ) -> Result<(), StepflowError>;
}

/// The default [`PoolFactory`], backed by scoped rayon pools.
#[derive(Debug, Clone, Default)]
pub struct ScopedPoolFactory {
    config: PoolConfig,
}

impl ScopedPoolFactory {
    /// Creates a factory with the given configuration.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    /// Returns the factory configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }
}

impl PoolFactory for ScopedPoolFactory {
    fn run_scoped<'scope>(
        &self,
        size: usize,
        diagnostics: &DiagnosticSnapshot,
        jobs: Vec<Job<'scope>>,
    ) -> Result<(), StepflowError> {
        let size = size.max(1);
        debug!(
            workers = size,
            jobs = jobs.len(),
            prefix = %self.config.thread_name_prefix,
            "Starting transient worker pool"
        );

        let names = self.config.clone();
        let mut builder = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(move |index| names.thread_name(index));
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }

        builder.build_scoped(
            |thread| {
                let _guard = diagnostics.install();
                thread.run();
            },
            |pool| pool.run_all(jobs),
        )?;

        debug!(workers = size, "Transient worker pool terminated");
        Ok(())
    }
}

/// Builds a long-lived pool for sharing between concurrent stages.
///
/// Workers clear their diagnostic context when they exit. While a stage job
/// runs on one of them, the stage installs the dispatching thread's context
/// for that job only.
pub fn build_shared_pool(config: &PoolConfig) -> Result<rayon::ThreadPool, StepflowError> {
    let names = config.clone();
    let mut builder = ThreadPoolBuilder::new()
        .num_threads(config.shared_threads.unwrap_or(0))
        .thread_name(move |index| names.thread_name(index))
        .exit_handler(|_| diagnostics::clear());
    if let Some(bytes) = config.stack_size {
        builder = builder.stack_size(bytes);
    }
    Ok(builder.build()?)
}
