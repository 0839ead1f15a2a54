//! Configuration module
//!
//! Resolves the runner configuration from CLI flags, `SUITE_RUNNER_*`
//! environment variables, an optional config file and defaults, in that
//! order of precedence.

mod env;
mod file;

pub use env::{print_env_help, EnvConfig};
pub use file::ConfigFile;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::executor::DEFAULT_CONCURRENCY;

/// Application name used to locate the packaged binary
pub const DEFAULT_APP_NAME: &str = "Atom";

/// One source of settings. Unset fields fall through to lower layers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigLayer {
    /// Repository root handed to the application as its resource path
    #[serde(default)]
    pub resource_path: Option<PathBuf>,

    /// Packaged application binary
    #[serde(default)]
    pub executable: Option<PathBuf>,

    /// Application metadata (package.json)
    #[serde(default)]
    pub metadata: Option<PathBuf>,

    /// Maximum suites running at once
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Application name used for the default binary location
    #[serde(default)]
    pub app_name: Option<String>,
}

impl ConfigLayer {
    /// Fill unset fields from `lower`
    pub fn or(self, lower: ConfigLayer) -> Self {
        Self {
            resource_path: self.resource_path.or(lower.resource_path),
            executable: self.executable.or(lower.executable),
            metadata: self.metadata.or(lower.metadata),
            concurrency: self.concurrency.or(lower.concurrency),
            app_name: self.app_name.or(lower.app_name),
        }
    }
}

/// Fully resolved runner configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    pub resource_path: PathBuf,
    pub executable: PathBuf,
    pub metadata: PathBuf,
    pub concurrency: usize,
}

impl RunnerConfig {
    /// Apply defaults to a merged layer. Relative paths resolve against `cwd`.
    pub fn from_layer(layer: ConfigLayer, cwd: &Path) -> Result<Self> {
        let resource_path = match layer.resource_path {
            Some(path) => absolutize(cwd, path),
            None => cwd.to_path_buf(),
        };

        let app_name = layer.app_name.as_deref().unwrap_or(DEFAULT_APP_NAME);
        let executable = match layer.executable {
            Some(path) => absolutize(cwd, path),
            None => default_executable(&resource_path, app_name),
        };

        let metadata = match layer.metadata {
            Some(path) => absolutize(cwd, path),
            None => resource_path.join("package.json"),
        };

        let concurrency = layer.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            anyhow::bail!("Concurrency must be at least 1");
        }

        Ok(Self {
            resource_path,
            executable,
            metadata,
            concurrency,
        })
    }

    /// Resolve from the process environment: `cli` over env vars over the
    /// config file over defaults.
    pub fn resolve(cli: ConfigLayer, config_path: Option<&Path>) -> Result<Self> {
        let env = EnvConfig::load();

        let config_path = config_path
            .map(Path::to_path_buf)
            .or_else(|| env.config_file.clone())
            .or_else(ConfigFile::find);

        let file_layer = match config_path {
            Some(path) => ConfigFile::load(&path)?.runner,
            None => ConfigLayer::default(),
        };

        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Self::from_layer(cli.or(env.layer()).or(file_layer), &cwd)
    }
}

fn absolutize(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

/// Platform-specific location of the packaged application under `<resource>/out`
pub fn default_executable(resource_path: &Path, app_name: &str) -> PathBuf {
    let out = resource_path.join("out");
    let lower = app_name.to_lowercase();

    if cfg!(target_os = "macos") {
        out.join(format!("{app_name}-darwin-x64"))
            .join(format!("{app_name}.app"))
            .join("Contents")
            .join("MacOS")
            .join(app_name)
    } else if cfg!(target_os = "windows") {
        out.join(format!("{app_name}-win32-x64"))
            .join(format!("{lower}.exe"))
    } else {
        out.join(format!("{app_name}-linux-x64")).join(lower)
    }
}
