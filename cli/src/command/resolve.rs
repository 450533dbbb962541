use crate::error::CliError;
use serde::Serialize;
use sprig_engine::runtime::config::BuildConfig;
use sprig_engine::runtime::resolver::{effective_pkg, PathResolver};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(
    about = "Show where an import path resolves to",
    args_conflicts_with_subcommands = true
)]
pub struct Resolve {
    /// Import path to look up.
    import_path: String,
    /// Source root of the importing package, relative to `<workspace>/src`.
    #[arg(short, long, default_value = "")]
    root: String,
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Resolution<'a> {
    import_path: &'a str,
    dir: PathBuf,
    root: String,
    /// Root the package's own imports resolve from.
    package_root: String,
}

impl Resolve {
    pub fn run(&self, config: &BuildConfig) -> Result<(), CliError> {
        let resolved = PathResolver::new(config).resolve(&self.root, &self.import_path)?;
        let resolution = Resolution {
            import_path: &self.import_path,
            package_root: effective_pkg(&resolved.root, &self.import_path),
            dir: resolved.dir,
            root: resolved.root,
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&resolution)?);
        } else {
            println!("{}", resolution.dir.display());
            println!("root: {:?}", resolution.root);
            println!("package root: {:?}", resolution.package_root);
        }
        Ok(())
    }
}
