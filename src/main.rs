//! Suite Runner - runs an application's spec suites against a packaged build
//!
//! Spawns the packaged application once per suite in test mode, at most two
//! at a time by default, and exits 0 only if every suite passed.
//!
//! ## Suites
//!
//! - core main process specs (`spec/main-process`, run with `--main-process`)
//! - core render process specs (`spec`)
//! - one suite per package dependency with a `node_modules/<name>/spec` directory
//!
//! ## Usage
//!
//! ```bash
//! # Run every suite against the default packaged build
//! suite-runner run
//!
//! # Point at a specific build and allow more parallelism
//! suite-runner run --executable out/Atom-linux-x64/atom -j 4
//!
//! # Show what would run
//! suite-runner list --json
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info, warn};

mod cli;
mod config;
mod discovery;
mod executor;
mod models;
mod utils;

use cli::{Args, Command};
use config::{print_env_help, EnvConfig, RunnerConfig};
use discovery::{discover_suites, AppMetadata};
use executor::{stdout_announcer, ParallelExecutor, SuiteLauncher};
use models::{Suite, SuiteKind, EXIT_FAILURE, EXIT_SUCCESS};
use utils::{init_logger, LogLevel};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(log_level(&args));

    let code = match execute(args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            EXIT_FAILURE
        }
    };

    // Exit without waiting on suite processes still running after a spawn error
    std::process::exit(code);
}

fn log_level(args: &Args) -> LogLevel {
    if args.verbose {
        return LogLevel::Debug;
    }

    let requested = args.log_level.clone().or_else(|| EnvConfig::load().log_level);
    match requested.map(|level| level.parse::<LogLevel>()) {
        Some(Ok(level)) => level,
        Some(Err(err)) => {
            eprintln!("{err}, using info");
            LogLevel::Info
        }
        None => LogLevel::Info,
    }
}

async fn execute(args: Args) -> Result<i32> {
    let Args {
        command, config, ..
    } = args;

    match command {
        Command::Run(suite_args) => {
            let config = RunnerConfig::resolve(suite_args.layer(), config.as_deref())?;
            run_suites(&config).await
        }
        Command::List(list_args) => {
            let config = RunnerConfig::resolve(list_args.suites.layer(), config.as_deref())?;
            list_suites(&config, list_args.json)?;
            Ok(EXIT_SUCCESS)
        }
        Command::Env => {
            print_env_help();
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Core suites plus package suites found through the application metadata
fn load_suites(config: &RunnerConfig) -> Result<Vec<Suite>> {
    let metadata = if config.metadata.is_file() {
        AppMetadata::load(&config.metadata)?
    } else {
        warn!(
            "No app metadata at {}, running core suites only",
            config.metadata.display()
        );
        AppMetadata::default()
    };

    if let Some(name) = &metadata.name {
        debug!("Loaded app metadata for {}", name);
    }

    Ok(discover_suites(&config.resource_path, &metadata))
}

async fn run_suites(config: &RunnerConfig) -> Result<i32> {
    let suites = load_suites(config)?;
    info!(
        "Testing {} with resource path {}",
        config.executable.display(),
        config.resource_path.display()
    );

    let launcher = SuiteLauncher::new(
        &config.executable,
        &config.resource_path,
        stdout_announcer(),
    );
    let summary = ParallelExecutor::new(config.concurrency)
        .run(suites, launcher)
        .await?;

    Ok(summary.exit_code())
}

fn list_suites(config: &RunnerConfig, json: bool) -> Result<()> {
    let suites = load_suites(config)?;
    let launcher = SuiteLauncher::new(
        &config.executable,
        &config.resource_path,
        stdout_announcer(),
    );

    if json {
        let entries: Vec<serde_json::Value> = suites
            .iter()
            .map(|suite| {
                serde_json::json!({
                    "suite": suite,
                    "command": launcher.command_line(suite),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("\nSuites ({} total, max {} concurrent)\n", suites.len(), config.concurrency);
    for (index, suite) in suites.iter().enumerate() {
        let origin = match suite.kind {
            SuiteKind::Package(_) => "package",
            SuiteKind::MainProcess | SuiteKind::RenderProcess => "core",
        };
        println!("  {:2}. {:28} [{}]", index + 1, suite.label(), origin);
        println!("      {}", launcher.command_line(suite));
    }
    println!();

    if !launcher.executable().exists() {
        warn!("Executable not found: {}", launcher.executable().display());
    }

    Ok(())
}
