//! Build configuration.
use crate::lang::filter::{host_arch, BuildConstraints};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding the default workspace location.
pub const WORKSPACE_ENV: &str = "SPRIG_PATH";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("error reading configuration {0}: {1}")]
    NotReadable(PathBuf, #[source] std::io::Error),
    #[error("invalid configuration: {0}")]
    Deserialization(#[from] toml::de::Error),
}

/// Workspace layout and target selection.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Workspace root; package sources live below `<workspace>/src`.
    pub workspace: PathBuf,
    /// Directory name marking vendored dependencies.
    pub vendor: String,
    /// Source file extension, without the dot.
    pub extension: String,
    /// Name of the package holding the program entry point.
    pub entry_package: String,
    /// Name of the entry point routine.
    pub entry_symbol: String,
    pub os: String,
    pub arch: String,
    /// Directories searched when a package is found neither vendored nor in the workspace.
    pub search_paths: Vec<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            vendor: "vendor".into(),
            extension: "sp".into(),
            entry_package: "main".into(),
            entry_symbol: "main".into(),
            os: std::env::consts::OS.into(),
            arch: host_arch().into(),
            search_paths: Vec::new(),
        }
    }
}

impl BuildConfig {
    pub fn new(workspace: impl Into<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Default::default()
        }
    }

    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml)?)
    }

    /// Read a TOML file. Relative workspace and search paths are taken relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::NotReadable(path.to_path_buf(), e))?;
        let mut config = Self::from_toml(&content)?;
        if let Some(parent) = path.parent() {
            config.workspace = parent.join(&config.workspace);
            config.search_paths = config
                .search_paths
                .iter()
                .map(|dir| parent.join(dir))
                .collect();
        }
        Ok(config)
    }

    /// `<workspace>/src`
    pub fn source_dir(&self) -> PathBuf {
        self.workspace.join("src")
    }

    /// The name-based file filter for this target.
    pub fn constraints(&self) -> BuildConstraints {
        BuildConstraints::new(&self.extension, &self.os, &self.arch)
    }
}

fn default_workspace() -> PathBuf {
    if let Some(path) = std::env::var_os(WORKSPACE_ENV) {
        return PathBuf::from(path);
    }
    match home::home_dir() {
        Some(home) => home.join("sprig"),
        None => PathBuf::from("sprig"),
    }
}
