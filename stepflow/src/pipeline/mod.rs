//! Pipeline building and execution.
//!
//! This module provides:
//! - The sequential pipeline runner and its run report
//! - Concurrent (fork-join) stages
//! - The best-effort compensation sweep shared by both

mod compensation;
mod concurrent;
mod report;
mod sequential;


pub use compensation::compensate;
pub use concurrent::ConcurrentStage;
pub use report::PipelineReport;
pub use sequential::Pipeline;
