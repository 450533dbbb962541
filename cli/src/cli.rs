use crate::command::files::Files;
use crate::command::resolve::Resolve;
use crate::error::{CliError, ConfigError};
use env_logger::Builder;
use log::LevelFilter;
use sprig_engine::runtime::config::BuildConfig;
use std::path::PathBuf;

const CONFIG_FILE: &str = "Sprig.toml";

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    Resolve(Resolve),
    Files(Files),
}

#[derive(clap::Parser, Debug)]
#[command(
author,
version = sprig_engine::version(),
about = "Sprig package tool",
long_about = None
)]
pub struct Cli {
    #[arg(short = 'f', long = "config", value_name = "FILE", global = true)]
    pub(crate) config_file: Option<PathBuf>,

    #[arg(short, long = "workspace", value_name = "DIR", global = true)]
    pub(crate) workspace: Option<PathBuf>,

    #[arg(short = 'I', long = "search", value_name = "DIR", global = true)]
    pub(crate) search_paths: Vec<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub(crate) verbose: u8,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Cli {
    pub fn run(&self) -> Result<(), CliError> {
        self.init_logger();
        let config = self.load_config_file()?;

        match &self.command {
            Command::Resolve(resolve) => resolve.run(&config)?,
            Command::Files(files) => files.run(&config)?,
        }

        Ok(())
    }

    fn init_logger(&self) {
        let level = match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        };
        Builder::new()
            .filter_level(LevelFilter::Warn)
            .filter_module("sprig_engine", level)
            .init();
    }

    fn load_config_file(&self) -> Result<BuildConfig, ConfigError> {
        let (explicit, path) = match &self.config_file {
            Some(path) if path.is_dir() => (true, path.join(CONFIG_FILE)),
            Some(path) => (true, path.clone()),
            None => (false, PathBuf::from(CONFIG_FILE)),
        };

        let mut config = if path.exists() {
            log::info!("loading configuration from {}", path.display());
            BuildConfig::load(&path)?
        } else if explicit {
            return Err(ConfigError::FileNotFound(path));
        } else {
            BuildConfig::default()
        };

        if let Some(workspace) = &self.workspace {
            config.workspace = workspace.clone();
        }
        config.search_paths.extend_from_slice(&self.search_paths);
        Ok(config)
    }
}
