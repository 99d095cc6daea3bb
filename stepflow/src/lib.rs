//! # Stepflow
//!
//! Ordered, compensating step pipelines.
//!
//! Stepflow runs units of work called steps against a caller-owned context:
//!
//! - **Sequential pipelines**: steps run in order on the calling thread
//! - **Concurrent stages**: fork-join groups of sibling steps on worker pools
//! - **Compensation**: completed steps are reversed, newest first, when a
//!   later step stops or fails
//! - **Diagnostic context**: per-thread tags follow work onto worker threads
//! - **Event-driven observability**: one summary per run, one event per failure
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stepflow::prelude::*;
//!
//! let pipeline = Pipeline::new("checkout")
//!     .step(ChargeCard::new())
//!     .step(
//!         ConcurrentStage::new("reserve", Vec::new())
//!             .step(ReserveItem::new("sku-1"))
//!             .step(ReserveItem::new("sku-2")),
//!     )
//!     .step(SendReceipt::new());
//!
//! let report = pipeline.execute(&order)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod diagnostics;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod pool;
pub mod runtime;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogFormat, LoggingConfig, PoolConfig, StepflowConfig};
    pub use crate::core::{ExecutionStatus, Flow, StepExecutionInfo, StepOutcome, StepResult};
    pub use crate::diagnostics::DiagnosticSnapshot;
    pub use crate::errors::StepflowError;
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::init_tracing;
    pub use crate::pipeline::{ConcurrentStage, Pipeline, PipelineReport};
    pub use crate::pool::{build_shared_pool, PoolFactory, ScopedPoolFactory, WorkerPool};
    pub use crate::runtime::execute_blocking;
    pub use crate::steps::{FnStep, NoOpStep, Step};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn prelude_builds_a_pipeline() {
        let ctx = AtomicUsize::new(0);
        let pipeline: Pipeline<AtomicUsize> = Pipeline::new("prelude")
            .step(NoOpStep::new("noop"))
            .step(FnStep::new("bump", |ctx: &AtomicUsize| {
                ctx.fetch_add(1, Ordering::SeqCst);
                Ok(Flow::Continue)
            }));

        let report = pipeline.execute(&ctx).unwrap();

        assert_eq!(report.status, ExecutionStatus::Success);
        assert_eq!(ctx.load(Ordering::SeqCst), 1);
    }
}
