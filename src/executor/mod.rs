//! Suite execution engine
//!
//! Launches suite processes and runs them under a concurrency ceiling.

mod parallel;
mod runner;

pub use parallel::{ParallelExecutor, DEFAULT_CONCURRENCY};
pub use runner::{stdout_announcer, SuiteLauncher};
