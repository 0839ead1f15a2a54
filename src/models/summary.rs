//! Suite results and run summary
//!
//! Reduces per-suite exit codes to a single process exit code.

use std::fmt;

use super::Suite;

/// Process exit code when every suite passed
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code when any suite failed or could not be spawned
pub const EXIT_FAILURE: i32 = 1;

/// Outcome of one suite whose process ran to completion
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuiteResult {
    pub suite: Suite,
    /// `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl SuiteResult {
    pub fn new(suite: Suite, exit_code: Option<i32>, duration_ms: u64) -> Self {
        Self {
            suite,
            exit_code,
            duration_ms,
        }
    }

    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl fmt::Display for SuiteResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed() { "PASS" } else { "FAIL" };
        match self.exit_code {
            Some(code) => write!(
                f,
                "[{}] {} (exit {}, {}ms)",
                status,
                self.suite.label(),
                code,
                self.duration_ms
            ),
            None => write!(
                f,
                "[{}] {} (terminated by signal, {}ms)",
                status,
                self.suite.label(),
                self.duration_ms
            ),
        }
    }
}

/// Results of a full run, in suite declaration order
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    pub results: Vec<SuiteResult>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn new(results: Vec<SuiteResult>, duration_ms: u64) -> Self {
        let total = results.len();
        let passed = results.iter().filter(|r| r.passed()).count();

        Self {
            results,
            total,
            passed,
            failed: total - passed,
            duration_ms,
        }
    }

    /// True iff every suite exited 0
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.all_passed() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &SuiteResult> {
        self.results.iter().filter(|r| !r.passed())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} suites, {} passed, {} failed in {}ms",
            self.total, self.passed, self.failed, self.duration_ms
        )
    }
}
