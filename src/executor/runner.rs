//! Suite process launcher
//!
//! Spawns the application binary for one suite and waits for it to exit.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::models::{Suite, SuiteResult};
use crate::utils::Timer;

/// Runner errors. Any of these aborts the whole run.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn {executable} for {suite} tests: {reason}")]
    Spawn {
        suite: String,
        executable: PathBuf,
        reason: std::io::Error,
    },

    #[error("Failed waiting on {suite} tests: {reason}")]
    Wait {
        suite: String,
        reason: std::io::Error,
    },

    #[error("Worker for {suite} tests panicked: {reason}")]
    Join {
        suite: String,
        reason: tokio::task::JoinError,
    },
}

impl RunnerError {
    pub fn suite(&self) -> &str {
        match self {
            RunnerError::Spawn { suite, .. }
            | RunnerError::Wait { suite, .. }
            | RunnerError::Join { suite, .. } => suite,
        }
    }
}

/// Where suite announcements are written
pub type Announcer = Arc<Mutex<dyn Write + Send>>;

/// Announcements on the process's stdout
pub fn stdout_announcer() -> Announcer {
    Arc::new(Mutex::new(std::io::stdout()))
}

/// Launches the application under test once per suite
#[derive(Clone)]
pub struct SuiteLauncher {
    executable: PathBuf,
    resource_path: PathBuf,
    announcer: Announcer,
}

impl SuiteLauncher {
    pub fn new(
        executable: impl Into<PathBuf>,
        resource_path: impl Into<PathBuf>,
        announcer: Announcer,
    ) -> Self {
        Self {
            executable: executable.into(),
            resource_path: resource_path.into(),
            announcer,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Command line for a suite, for display only
    pub fn command_line(&self, suite: &Suite) -> String {
        let mut parts = vec![self.executable.display().to_string()];
        parts.extend(
            suite
                .args(&self.resource_path)
                .iter()
                .map(|a| a.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }

    /// Write the suite's announcement line. A closed stdout is not fatal.
    fn announce(&self, suite: &Suite) {
        let mut out = self.announcer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(out, "{}", suite.announcement()).and_then(|_| out.flush()) {
            debug!("Could not announce {}: {}", suite.label(), err);
        }
    }

    /// Announce the suite, run the binary with inherited stdio, and wait for it.
    ///
    /// A non-zero exit is a result; only failing to create or wait on the
    /// process is an error.
    pub async fn launch(&self, suite: Suite) -> Result<SuiteResult, RunnerError> {
        self.announce(&suite);
        info!("Starting {}", suite);

        let timer = Timer::start(suite.label());

        let mut child = Command::new(&self.executable)
            .args(suite.args(&self.resource_path))
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|reason| RunnerError::Spawn {
                suite: suite.label(),
                executable: self.executable.clone(),
                reason,
            })?;

        let status = child.wait().await.map_err(|reason| RunnerError::Wait {
            suite: suite.label(),
            reason,
        })?;

        let result = SuiteResult::new(suite, status.code(), timer.stop());
        if result.passed() {
            info!("{}", result);
        } else {
            warn!("{}", result);
        }

        Ok(result)
    }
}
