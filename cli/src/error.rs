use sprig_engine::runtime::config;
use sprig_engine::runtime::BuildError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("unable to open {0}: {1}")]
    NotReadable(PathBuf, #[source] std::io::Error),
    #[error("failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file {0} not found")]
    FileNotFound(PathBuf),
    #[error(transparent)]
    Invalid(#[from] config::ConfigError),
}
