//! Data models for suite runs
//!
//! This module contains the suite and result types shared by discovery and execution.

mod suite;
mod summary;

pub use suite::{Suite, SuiteKind};
pub use summary::{RunSummary, SuiteResult, EXIT_FAILURE, EXIT_SUCCESS};
