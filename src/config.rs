//! Pipeline configuration
//!
//! Loaded from an optional JSON file, then overridden from the environment.

use crate::autotools::{DEFAULT_INSTALLER, DEFAULT_PACKAGES};
use crate::error::{PatchError, Result};
use crate::locator::DEFAULT_MAX_DEPTH;
use crate::recipe::LibffiRecipe;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Extra search roots, separated like `PATH`
pub const SEARCH_ROOTS_ENV_VAR: &str = "LIBFFI_PATCH_SEARCH_ROOTS";
pub const SKIP_DEPS_ENV_VAR: &str = "LIBFFI_PATCH_SKIP_DEPS";
/// Installer command line, whitespace separated
pub const INSTALLER_ENV_VAR: &str = "LIBFFI_PATCH_INSTALLER";

/// Log level for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    /// Log level (default: info)
    #[serde(rename = "log-level")]
    pub log_level: LogLevel,

    /// Project directory whose `.buildozer` is searched (default: ".")
    #[serde(rename = "project-dir")]
    pub project_dir: PathBuf,

    /// Search `<project>/.buildozer` and `~/.buildozer` (default: true)
    #[serde(rename = "use-default-roots")]
    pub use_default_roots: bool,

    /// Roots searched in addition to the default Buildozer caches
    #[serde(rename = "search-roots", skip_serializing_if = "Vec::is_empty")]
    pub search_roots: Vec<PathBuf>,

    /// Source trees patched directly, without searching
    #[serde(rename = "source-dirs", skip_serializing_if = "Vec::is_empty")]
    pub source_dirs: Vec<PathBuf>,

    /// Maximum directory depth below each root (default: 10)
    #[serde(rename = "max-depth")]
    pub max_depth: usize,

    /// Run the package installer before patching (default: true)
    #[serde(rename = "install-dependencies")]
    pub install_dependencies: bool,

    /// Installer command, packages are appended
    pub installer: Vec<String>,

    pub packages: Vec<String>,

    pub recipe: LibffiRecipe,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            project_dir: PathBuf::from("."),
            use_default_roots: true,
            search_roots: vec![],
            source_dirs: vec![],
            max_depth: DEFAULT_MAX_DEPTH,
            install_dependencies: true,
            installer: DEFAULT_INSTALLER.iter().map(|s| s.to_string()).collect(),
            packages: DEFAULT_PACKAGES.iter().map(|s| s.to_string()).collect(),
            recipe: LibffiRecipe::default(),
        }
    }
}

impl PatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the log level
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn project_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.project_dir = path.into();
        self
    }

    /// Add a search root
    pub fn add_search_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.search_roots.push(root.into());
        self
    }

    /// Add a source tree to patch directly
    pub fn add_source_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.source_dirs.push(dir.into());
        self
    }

    pub fn use_default_roots(mut self, enabled: bool) -> Self {
        self.use_default_roots = enabled;
        self
    }

    pub fn install_dependencies(mut self, enabled: bool) -> Self {
        self.install_dependencies = enabled;
        self
    }

    pub fn installer<I, S>(mut self, installer: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installer = installer.into_iter().map(Into::into).collect();
        self
    }

    /// Default Buildozer roots followed by any configured ones
    pub fn all_search_roots(&self) -> Vec<PathBuf> {
        let mut roots = if self.use_default_roots {
            crate::locator::default_search_roots(&self.project_dir)
        } else {
            Vec::new()
        };
        roots.extend(self.search_roots.iter().cloned());
        roots
    }

    /// Convert the configuration to a JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(PatchError::from)
    }

    /// Create a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(PatchError::from)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            PatchError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Apply `LIBFFI_PATCH_*` overrides from the process environment
    pub fn apply_env(self) -> Self {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(roots) = lookup(SEARCH_ROOTS_ENV_VAR) {
            self.search_roots
                .extend(std::env::split_paths(&roots).filter(|p| !p.as_os_str().is_empty()));
        }

        if lookup(SKIP_DEPS_ENV_VAR).is_some() {
            self.install_dependencies = false;
        }

        if let Some(installer) = lookup(INSTALLER_ENV_VAR) {
            self.installer = installer.split_whitespace().map(str::to_string).collect();
        }

        self
    }
}
