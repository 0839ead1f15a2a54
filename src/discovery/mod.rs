//! Suite discovery
//!
//! Builds the list of suites for a run: the two core suites plus one suite
//! per package dependency that ships a `spec` directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::Suite;

/// Directory holding installed package dependencies
const PACKAGES_DIR: &str = "node_modules";

/// Spec directory name inside an installed package
const SPEC_DIR: &str = "spec";

/// Application metadata, as read from the application's `package.json`
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AppMetadata {
    #[serde(default)]
    pub name: Option<String>,

    /// Package dependency name -> version. Only the names are used.
    #[serde(default, rename = "packageDependencies")]
    pub package_dependencies: serde_json::Map<String, serde_json::Value>,
}

impl AppMetadata {
    /// Load metadata from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read app metadata: {}", path.display()))?;

        Self::from_json(&content)
            .with_context(|| format!("Failed to parse app metadata: {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Package dependency names in document order
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.package_dependencies.keys().map(String::as_str)
    }
}

/// Installed location of a package's spec directory
pub fn package_spec_dir(resource_path: &Path, package: &str) -> PathBuf {
    resource_path.join(PACKAGES_DIR).join(package).join(SPEC_DIR)
}

/// Find package suites: one per dependency whose spec directory exists
pub fn discover_package_suites(resource_path: &Path, metadata: &AppMetadata) -> Vec<Suite> {
    let mut suites = Vec::new();

    for package in metadata.package_names() {
        let spec_dir = package_spec_dir(resource_path, package);
        if spec_dir.is_dir() {
            debug!("Found specs for {} at {}", package, spec_dir.display());
            suites.push(Suite::package(package, spec_dir));
        } else {
            debug!("Skipping {}: no spec directory", package);
        }
    }

    suites
}

/// All suites for a run, in declaration order
pub fn discover_suites(resource_path: &Path, metadata: &AppMetadata) -> Vec<Suite> {
    let mut suites = Suite::core(resource_path);
    suites.extend(discover_package_suites(resource_path, metadata));
    suites
}
