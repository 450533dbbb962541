use crate::error::CliError;
use sprig_engine::runtime::config::BuildConfig;
use sprig_engine::runtime::resolver::PathResolver;
use sprig_engine::runtime::sources::{gzip_archive, SourceSet};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(
    about = "List the source files a package build would load",
    args_conflicts_with_subcommands = true
)]
pub struct Files {
    #[arg(required_unless_present = "archive")]
    import_path: Option<String>,
    #[arg(short, long, default_value = "")]
    root: String,
    /// Include test files.
    #[arg(short, long)]
    tests: bool,
    /// Read a gzip-compressed tar archive instead of resolving an import path.
    #[arg(short, long, value_name = "FILE", conflicts_with = "import_path")]
    archive: Option<PathBuf>,
}

impl Files {
    pub fn run(&self, config: &BuildConfig) -> Result<(), CliError> {
        let filter = config.constraints();
        let skip_test = !self.tests;

        if let Some(path) = &self.archive {
            let file =
                File::open(path).map_err(|err| CliError::NotReadable(path.clone(), err))?;
            let mut archive = gzip_archive(BufReader::new(file));
            let sources = SourceSet::archive(&mut archive, &filter, skip_test)?;
            return list(sources);
        }

        let import_path = self.import_path.as_deref().unwrap_or_default();
        let resolved = PathResolver::new(config).resolve(&self.root, import_path)?;
        log::info!("{} resolved to {}", import_path, resolved.dir.display());
        list(SourceSet::directory(&resolved.dir, &filter, skip_test))
    }
}

fn list(sources: SourceSet<'_>) -> Result<(), CliError> {
    let mut count = 0;
    for file in sources {
        let file = file?;
        println!("{}\t{} bytes", file.name, file.content.len());
        count += 1;
    }
    log::info!("{} files selected", count);
    Ok(())
}
