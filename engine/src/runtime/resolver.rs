//! Import path resolution.
//!
//! Package sources live below `<workspace>/src`. A package found below `<root>/vendor` shadows
//! the workspace copy for importers under `<root>`, and vendor trees nest: a lookup walks
//! outward one vendor level at a time before falling back to the workspace and finally to a
//! [`PackageLocator`].
use crate::runtime::config::BuildConfig;
use crate::runtime::BuildError;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

/// Last-resort package discovery, consulted once the vendor chain is exhausted.
pub trait PackageLocator: Send + Sync + Debug {
    fn locate(&self, import_path: &str) -> Option<PathBuf>;
}

/// Looks packages up below a list of directories, in order.
#[derive(Clone, Debug, Default)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

impl PackageLocator for SearchPath {
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(clean(import_path)))
            .find(|dir| dir.is_dir())
    }
}

/// Where an import path was found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// Directory holding the package sources.
    pub dir: PathBuf,
    /// Root nested imports of the package resolve from.
    pub root: String,
}

#[derive(Debug)]
pub struct PathResolver {
    source_dir: PathBuf,
    vendor: String,
    fallback: Box<dyn PackageLocator>,
}

impl PathResolver {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            source_dir: config.source_dir(),
            vendor: config.vendor.clone(),
            fallback: Box::new(SearchPath::new(config.search_paths.clone())),
        }
    }

    pub fn with_locator<L: PackageLocator + 'static>(mut self, locator: L) -> Self {
        self.fallback = Box::new(locator);
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Find the source directory of `import_path` as seen from packages under `root`.
    pub fn resolve(&self, root: &str, import_path: &str) -> Result<Resolved, BuildError> {
        let mut root = clean(root);
        loop {
            let vendored = join(&[root.as_str(), self.vendor.as_str()]);
            let dir = self.source_dir.join(join(&[vendored.as_str(), import_path]));
            if dir.is_dir() {
                log::debug!("{} found vendored in {}", import_path, dir.display());
                return Ok(Resolved {
                    dir,
                    root: vendored,
                });
            }

            let dir = self.source_dir.join(effective_pkg(&root, import_path));
            if dir.is_dir() {
                log::debug!("{} found in {}", import_path, dir.display());
                return Ok(Resolved { dir, root });
            }

            if root.is_empty() {
                return match self.fallback.locate(import_path) {
                    Some(dir) => {
                        log::debug!("{} located in {}", import_path, dir.display());
                        Ok(Resolved {
                            dir,
                            root: String::new(),
                        })
                    }
                    None => Err(BuildError::NotFound(import_path.to_string())),
                };
            }

            root = previous_root(&root, &self.vendor);
        }
    }
}

/// The enclosing source root of `root`: everything before its last vendor segment.
///
/// Returns an empty root once no outer vendor level is left.
pub fn previous_root(root: &str, vendor: &str) -> String {
    let segments: Vec<&str> = root.split('/').collect();
    match segments.iter().rposition(|segment| *segment == vendor) {
        None | Some(0) => String::new(),
        Some(index) => join(&segments[..index]),
    }
}

/// Append `path` to `root`, leaving out the trailing segments of `root` that `path`
/// repeats.
pub fn effective_pkg(root: &str, path: &str) -> String {
    let split_root: Vec<&str> = root.split('/').collect();
    let split_path: Vec<&str> = path.split('/').collect();

    let mut result = Vec::new();
    let mut root_index = 0;
    let mut prev_root_index = 0;
    for (i, part) in split_path.iter().rev().enumerate() {
        let index = split_root
            .len()
            .checked_sub(1 + root_index)
            .filter(|index| *index > 0);
        match index {
            Some(index) if i != 0 && *part == split_root[index] => {
                prev_root_index = root_index;
                root_index += 1;
            }
            _ if prev_root_index == root_index => result.push(*part),
            _ => {}
        }
    }
    result.push(root);
    result.reverse();
    join(&result)
}

/// Whether `path` starts with `./` or `../`.
pub fn is_relative(path: &str) -> bool {
    path.starts_with("./") || path.starts_with("../")
}

/// Join slash-delimited fragments, dropping empty and `.` segments and folding `..`.
pub(crate) fn join(fragments: &[&str]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in fragments.iter().flat_map(|fragment| fragment.split('/')) {
        match segment {
            "" | "." => {}
            ".." if matches!(segments.last(), Some(last) if *last != "..") => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }
    segments.join("/")
}

pub(crate) fn clean(path: &str) -> String {
    join(&[path])
}
