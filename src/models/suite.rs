//! Suite models
//!
//! A suite is one logical group of specs, run by one invocation of the
//! application binary.

use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of suite, which decides its label and extra flags
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteKind {
    /// Core specs run inside the main process
    MainProcess,
    /// Core specs run inside a render process
    RenderProcess,
    /// Specs shipped with an installed package dependency
    Package(String),
}

impl SuiteKind {
    /// Human-readable name used in announcements
    pub fn name(&self) -> String {
        match self {
            SuiteKind::MainProcess => "core main process".to_string(),
            SuiteKind::RenderProcess => "core render process".to_string(),
            SuiteKind::Package(name) => name.clone(),
        }
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One suite invocation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Suite {
    pub kind: SuiteKind,
    pub target: PathBuf,
}

impl Suite {
    pub fn new(kind: SuiteKind, target: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }

    /// Main-process suite over `<resource>/spec/main-process`
    pub fn main_process(resource_path: &Path) -> Self {
        Self::new(
            SuiteKind::MainProcess,
            resource_path.join("spec").join("main-process"),
        )
    }

    /// Render-process suite over `<resource>/spec`
    pub fn render_process(resource_path: &Path) -> Self {
        Self::new(SuiteKind::RenderProcess, resource_path.join("spec"))
    }

    /// Package suite over a discovered spec directory
    pub fn package(name: impl Into<String>, spec_dir: impl Into<PathBuf>) -> Self {
        Self::new(SuiteKind::Package(name.into()), spec_dir)
    }

    /// The two suites every run starts with
    pub fn core(resource_path: &Path) -> Vec<Suite> {
        vec![
            Self::main_process(resource_path),
            Self::render_process(resource_path),
        ]
    }

    pub fn label(&self) -> String {
        self.kind.name()
    }

    /// Line printed right before the suite's process is spawned
    pub fn announcement(&self) -> String {
        format!("Executing {} tests...", self.kind.name())
    }

    /// Arguments passed to the application binary, in order:
    /// `--resource-path <resource> --test [--main-process] <target>`
    pub fn args(&self, resource_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--resource-path".into(),
            resource_path.as_os_str().to_owned(),
            "--test".into(),
        ];
        if self.kind == SuiteKind::MainProcess {
            args.push("--main-process".into());
        }
        args.push(self.target.as_os_str().to_owned());
        args
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.target.display())
    }
}
