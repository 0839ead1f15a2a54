//! Parallel suite execution
//!
//! Runs suites with a fixed concurrency ceiling and reduces their results.

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use super::runner::{RunnerError, SuiteLauncher};
use crate::models::{RunSummary, Suite, SuiteResult};
use crate::utils::Timer;

/// At most this many suite processes run at once unless configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Bounded suite executor
pub struct ParallelExecutor {
    max_concurrent: usize,
}

impl ParallelExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Run every suite through the application binary
    pub async fn run(
        &self,
        suites: Vec<Suite>,
        launcher: SuiteLauncher,
    ) -> Result<RunSummary, RunnerError> {
        let launcher = Arc::new(launcher);
        self.run_with(suites, move |suite| {
            let launcher = launcher.clone();
            async move { launcher.launch(suite).await }
        })
        .await
    }

    /// Run suites through `launch`, at most `max_concurrent` at a time.
    ///
    /// Suites start in declaration order and the summary keeps that order.
    /// The first error or worker panic closes the pool: queued suites never
    /// start, and the error is returned without waiting for suites that are
    /// still running. Those are left alone, not cancelled.
    pub async fn run_with<F, Fut>(
        &self,
        suites: Vec<Suite>,
        launch: F,
    ) -> Result<RunSummary, RunnerError>
    where
        F: Fn(Suite) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<SuiteResult, RunnerError>> + Send + 'static,
    {
        info!(
            "Running {} suites (max {} concurrent)",
            suites.len(),
            self.max_concurrent
        );

        let timer = Timer::start("suite run");
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let launch = Arc::new(launch);
        let mut slots: Vec<Option<SuiteResult>> = vec![None; suites.len()];
        let mut pending = FuturesUnordered::new();

        for (index, suite) in suites.into_iter().enumerate() {
            // Closed once a suite has failed to spawn
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                debug!("Pool closed, not starting {}", suite.label());
                break;
            };

            let label = suite.label();
            let semaphore = semaphore.clone();
            let launch = launch.clone();

            let handle = tokio::spawn(async move {
                let outcome = AssertUnwindSafe(async move { launch(suite).await })
                    .catch_unwind()
                    .await;

                // Close before the permit is released so no queued suite slips in
                match outcome {
                    Ok(result) => {
                        if result.is_err() {
                            semaphore.close();
                        }
                        drop(permit);
                        result
                    }
                    Err(panic) => {
                        semaphore.close();
                        drop(permit);
                        std::panic::resume_unwind(panic)
                    }
                }
            });

            pending.push(async move { (index, label, handle.await) });
        }

        while let Some((index, label, joined)) = pending.next().await {
            match joined {
                Ok(Ok(result)) => slots[index] = Some(result),
                Ok(Err(err)) => {
                    error!(suite = err.suite(), "Aborting run: {}", err);
                    return Err(err);
                }
                Err(reason) => {
                    semaphore.close();
                    error!("Aborting run: {} worker failed", label);
                    return Err(RunnerError::Join {
                        suite: label,
                        reason,
                    });
                }
            }
        }

        let summary = RunSummary::new(slots.into_iter().flatten().collect(), timer.stop());

        info!("Run completed: {}", summary);
        for failure in summary.failures() {
            info!("  {}", failure);
        }

        Ok(summary)
    }
}

impl Default for ParallelExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::executor::runner::stdout_announcer;
    use crate::models::{EXIT_FAILURE, EXIT_SUCCESS};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn suites(packages: &[&str]) -> Vec<Suite> {
        let root = Path::new("/repo");
        let mut suites = Suite::core(root);
        for name in packages {
            suites.push(Suite::package(*name, root.join("node_modules").join(name).join("spec")));
        }
        suites
    }

    fn spawn_error(suite: &Suite) -> RunnerError {
        RunnerError::Spawn {
            suite: suite.label(),
            executable: PathBuf::from("/missing"),
            reason: std::io::Error::from(std::io::ErrorKind::NotFound),
        }
    }

    #[test]
    fn test_executor_creation() {
        assert_eq!(ParallelExecutor::default().max_concurrent, 2);
        assert_eq!(ParallelExecutor::new(0).max_concurrent, 1);
    }

    #[tokio::test]
    async fn test_all_passing_suites_exit_zero() {
        let summary = ParallelExecutor::default()
            .run_with(suites(&[]), |suite| async move {
                Ok::<_, RunnerError>(SuiteResult::new(suite, Some(0), 1))
            })
            .await
            .unwrap();

        assert_eq!(summary.total, 2);
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_failing_suite_does_not_stop_others() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let seen = attempts.clone();

        let summary = ParallelExecutor::default()
            .run_with(suites(&["foo", "bar"]), move |suite| {
                seen.lock().unwrap().push(suite.label());
                async move {
                    let code = if suite.label() == "foo" { 1 } else { 0 };
                    Ok::<_, RunnerError>(SuiteResult::new(suite, Some(code), 1))
                }
            })
            .await
            .unwrap();

        let mut attempted = attempts.lock().unwrap().clone();
        attempted.sort();
        assert_eq!(
            attempted,
            vec!["bar", "core main process", "core render process", "foo"]
        );
        assert_eq!(summary.total, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.exit_code(), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (active_c, peak_c) = (active.clone(), peak.clone());

        let summary = ParallelExecutor::new(2)
            .run_with(suites(&["a", "b", "c", "d"]), move |suite| {
                let active = active_c.clone();
                let peak = peak_c.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, RunnerError>(SuiteResult::new(suite, Some(0), 20))
                }
            })
            .await
            .unwrap();

        assert_eq!(summary.total, 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_summary_keeps_declaration_order() {
        let summary = ParallelExecutor::new(3)
            .run_with(suites(&["fast"]), |suite| async move {
                let delay = match suite.label().as_str() {
                    "core main process" => 40,
                    "core render process" => 20,
                    _ => 0,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, RunnerError>(SuiteResult::new(suite, Some(0), delay))
            })
            .await
            .unwrap();

        let labels: Vec<String> = summary.results.iter().map(|r| r.suite.label()).collect();
        assert_eq!(
            labels,
            vec!["core main process", "core render process", "fast"]
        );
    }

    #[tokio::test]
    async fn test_spawn_error_aborts_without_waiting() {
        let launched = Arc::new(AtomicUsize::new(0));
        let counter = launched.clone();

        let executor = ParallelExecutor::new(2);
        let run = executor.run_with(suites(&["foo", "bar"]), move |suite| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                match suite.label().as_str() {
                    // Never finishes; the run must not wait for it
                    "core main process" => std::future::pending().await,
                    "core render process" => Err::<SuiteResult, _>(spawn_error(&suite)),
                    _ => Ok(SuiteResult::new(suite, Some(0), 1)),
                }
            }
        });

        let result = tokio::time::timeout(Duration::from_secs(5), run)
            .await
            .expect("run waited on a running sibling");

        let err = result.unwrap_err();
        assert!(matches!(err, RunnerError::Spawn { .. }));
        assert_eq!(err.suite(), "core render process");
        // Queued package suites never start
        assert_eq!(launched.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_spawn_error_on_first_suite() {
        let launched = Arc::new(AtomicUsize::new(0));
        let counter = launched.clone();

        let result = ParallelExecutor::new(1)
            .run_with(suites(&["foo"]), move |suite| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Err::<SuiteResult, _>(spawn_error(&suite)) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(launched.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_with_real_processes() {
        let root = Path::new("/tmp");

        let summary = ParallelExecutor::default()
            .run(Suite::core(root), SuiteLauncher::new("true", root, stdout_announcer()))
            .await
            .unwrap();
        assert_eq!(summary.exit_code(), EXIT_SUCCESS);

        let summary = ParallelExecutor::default()
            .run(Suite::core(root), SuiteLauncher::new("false", root, stdout_announcer()))
            .await
            .unwrap();
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.exit_code(), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_run_with_missing_executable() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = SuiteLauncher::new(dir.path().join("missing"), dir.path(), stdout_announcer());

        let result = ParallelExecutor::default()
            .run(Suite::core(dir.path()), launcher)
            .await;

        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_worker_panic_stops_queued_suites() {
        let launched = Arc::new(AtomicUsize::new(0));
        let counter = launched.clone();

        let result = ParallelExecutor::new(1)
            .run_with(suites(&["a", "b", "c"]), move |suite| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt == 0 {
                        panic!("stdout closed");
                    }
                    Ok::<_, RunnerError>(SuiteResult::new(suite, Some(0), 1))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RunnerError::Join { .. }));
        assert_eq!(err.suite(), "core main process");
        assert_eq!(launched.load(Ordering::SeqCst), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_package_suite_with_announcements() {
        use crate::discovery::{discover_suites, AppMetadata};
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("node_modules/foo/spec")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/bar")).unwrap();

        // Exits 1 only when the last argument is foo's spec directory
        let app = root.join("fake-app");
        std::fs::write(
            &app,
            "#!/bin/sh\nfor last; do :; done\ncase \"$last\" in\n  */node_modules/foo/spec) exit 1 ;;\nesac\nexit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&app, std::fs::Permissions::from_mode(0o755)).unwrap();

        let metadata = AppMetadata::from_json(
            r#"{"packageDependencies": {"foo": "1.0.0", "bar": "2.0.0"}}"#,
        )
        .unwrap();
        let suites = discover_suites(root, &metadata);
        assert_eq!(suites.len(), 3);

        let announcements = Arc::new(Mutex::new(Vec::<u8>::new()));
        let launcher = SuiteLauncher::new(&app, root, announcements.clone());

        let summary = ParallelExecutor::default()
            .run(suites, launcher)
            .await
            .unwrap();

        let output = String::from_utf8(announcements.lock().unwrap().clone()).unwrap();
        assert_eq!(
            output.lines().collect::<Vec<_>>(),
            vec![
                "Executing core main process tests...",
                "Executing core render process tests...",
                "Executing foo tests...",
            ]
        );
        assert_eq!(summary.total, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results[2].exit_code, Some(1));
        assert_eq!(summary.exit_code(), EXIT_FAILURE);
    }
}
