//! Testing utilities for stepflow pipelines.
//!
//! This module provides:
//! - A recording mock step and its shared journal
//! - A pool factory that counts pool creations
//! - Assertions on compensation order

mod assertions;
mod mocks;

pub use assertions::{assert_not_reversed, assert_reversed_in_order};
pub use mocks::{CallCounter, CountingPoolFactory, Journal, RecordingStep};
