//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration. These only
//! configure the runner; suite processes inherit the environment untouched.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

use super::ConfigLayer;

/// Environment variable prefix
const ENV_PREFIX: &str = "SUITE_RUNNER";

/// Configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Resource path from SUITE_RUNNER_RESOURCE_PATH
    pub resource_path: Option<PathBuf>,
    /// Executable from SUITE_RUNNER_EXECUTABLE
    pub executable: Option<PathBuf>,
    /// Metadata file from SUITE_RUNNER_METADATA
    pub metadata: Option<PathBuf>,
    /// Concurrency from SUITE_RUNNER_CONCURRENCY
    pub concurrency: Option<usize>,
    /// App name from SUITE_RUNNER_APP_NAME
    pub app_name: Option<String>,
    /// Config file from SUITE_RUNNER_CONFIG
    pub config_file: Option<PathBuf>,
    /// Log level from SUITE_RUNNER_LOG_LEVEL
    pub log_level: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            resource_path: get_env("RESOURCE_PATH").map(PathBuf::from),
            executable: get_env("EXECUTABLE").map(PathBuf::from),
            metadata: get_env("METADATA").map(PathBuf::from),
            concurrency: get_env_parse("CONCURRENCY"),
            app_name: get_env("APP_NAME"),
            config_file: get_env("CONFIG").map(PathBuf::from),
            log_level: get_env("LOG_LEVEL"),
        }
    }

    /// Runner settings as a config layer
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

/// Get environment variable with prefix
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Get environment variable and parse to type
fn get_env_parse<T: FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| parse_env_value(name, &v))
}

/// A value that does not parse is dropped with a warning
fn parse_env_value<T: FromStr>(name: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring {ENV_PREFIX}_{name}={value:?}: not a valid value");
            None
        }
    }
}

/// Print all SUITE_RUNNER environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_RESOURCE_PATH  Repository root passed as --resource-path");
    println!("  {ENV_PREFIX}_EXECUTABLE     Packaged application binary");
    println!("  {ENV_PREFIX}_METADATA       Application metadata file (package.json)");
    println!("  {ENV_PREFIX}_CONCURRENCY    Maximum suites running at once");
    println!("  {ENV_PREFIX}_APP_NAME       Application name for the default binary path");
    println!("  {ENV_PREFIX}_CONFIG         Path to configuration file");
    println!("  {ENV_PREFIX}_LOG_LEVEL      Log level (trace, debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_EXECUTABLE=out/Atom-linux-x64/atom");
    println!("  suite-runner run");
}
