//! Package build runtime.
//!
//! Import resolution, source loading and the shared state packages are registered in.
use crate::lang::SymbolTable;
use serde::Serialize;
use std::path::PathBuf;

pub mod config;
pub mod frame;
pub mod registry;
pub mod resolver;
pub mod sources;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("unable to find source related to: {0:?}")]
    NotFound(String),
    #[error("import cycle not allowed\n\timports {0}")]
    ImportCycle(String),
    #[error("found packages {first} and {second} in {dir}")]
    PackageNameConflict {
        first: String,
        second: String,
        dir: String,
    },
    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to declare {import_path}: {source}")]
    Declaration {
        import_path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("{count} declaration(s) of {import_path} still unresolved after retry")]
    Unresolved { import_path: String, count: usize },
    #[error("failed to lower {import_path}: {source}")]
    Lowering {
        import_path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to initialize {import_path}: {source}")]
    Initialization {
        import_path: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("malformed archive: {0}")]
    ArchiveFormat(#[source] std::io::Error),
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("package location {0} not in workspace")]
    OutsideWorkspace(PathBuf),
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Import path the error is about, if it names one.
    pub fn import_path(&self) -> Option<&str> {
        match self {
            BuildError::NotFound(path) | BuildError::ImportCycle(path) => Some(path),
            BuildError::Declaration { import_path, .. }
            | BuildError::Unresolved { import_path, .. }
            | BuildError::Lowering { import_path, .. }
            | BuildError::Initialization { import_path, .. } => Some(import_path),
            _ => None,
        }
    }
}

/// A built package: its name and global symbols.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackageRecord {
    pub name: String,
    pub symbols: SymbolTable,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, symbols: SymbolTable) -> Self {
        Self {
            name: name.into(),
            symbols,
        }
    }
}
