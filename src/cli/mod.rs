//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigLayer;

/// Runs an application's core and package spec suites against a packaged build
#[derive(Parser, Debug)]
#[command(name = "suite-runner")]
#[command(version)]
#[command(about = "Run core and package spec suites against a packaged application")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every suite and exit with the combined result
    Run(SuiteArgs),

    /// List the suites a run would execute, without running them
    List(ListArgs),

    /// Show recognised environment variables
    Env,
}

/// Arguments shared by run and list
#[derive(Parser, Debug, Default)]
pub struct SuiteArgs {
    /// Repository root passed to the application as its resource path
    #[arg(short, long)]
    pub resource_path: Option<PathBuf>,

    /// Packaged application binary
    #[arg(short, long)]
    pub executable: Option<PathBuf>,

    /// Application metadata file listing package dependencies
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Maximum number of suites running at once
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Application name used to locate the default binary
    #[arg(long)]
    pub app_name: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    #[command(flatten)]
    pub suites: SuiteArgs,

    /// Print suites as JSON
    #[arg(long)]
    pub json: bool,
}

impl SuiteArgs {
    pub fn layer(&self) -> ConfigLayer {
        ConfigLayer {
            resource_path: self.resource_path.clone(),
            executable: self.executable.clone(),
            metadata: self.metadata.clone(),
            concurrency: self.concurrency,
            app_name: self.app_name.clone(),
        }
    }
}
