//! Package source sets.
//!
//! A [`SourceSet`] yields the files of one package, already filtered by a [`FileFilter`],
//! whether they come from a directory, a gzip-compressed tar archive or memory.
use crate::lang::FileFilter;
use crate::runtime::BuildError;
use flate2::read::GzDecoder;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::Utf8Error;
use walkdir::WalkDir;

/// One selected source file.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.content)
    }
}

impl Debug for SourceFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} bytes)", self.name, self.content.len())
    }
}

/// Lazily produced, filtered sequence of the files of one package.
///
/// The sequence can be consumed once. Reading or decoding failures are yielded as errors.
pub struct SourceSet<'a> {
    location: String,
    entries: Box<dyn Iterator<Item = Result<SourceFile, BuildError>> + 'a>,
}

impl<'a> SourceSet<'a> {
    /// Immediate children of `dir`, in file name order. Subdirectories are not entered.
    pub fn directory(dir: &Path, filter: &'a dyn FileFilter, skip_test: bool) -> Self {
        let root = dir.to_path_buf();
        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        let path = err.path().unwrap_or(&root).to_path_buf();
                        return Some(Err(BuildError::io(path, err.into())));
                    }
                };
                if !entry.file_type().is_file() {
                    return None;
                }
                let name = entry.path().to_string_lossy().into_owned();
                if !filter.include(&name, skip_test) {
                    log::debug!("skipping {}", name);
                    return None;
                }
                Some(
                    fs::read(entry.path())
                        .map(|content| SourceFile { name, content })
                        .map_err(|err| BuildError::io(entry.path(), err)),
                )
            });

        Self {
            location: dir.to_string_lossy().into_owned(),
            entries: Box::new(entries),
        }
    }

    /// Regular-file entries of a tar archive, in archive order. Directory and other entries
    /// are skipped.
    pub fn archive<R: Read + 'a>(
        archive: &'a mut tar::Archive<R>,
        filter: &'a dyn FileFilter,
        skip_test: bool,
    ) -> Result<Self, BuildError> {
        let entries = archive
            .entries()
            .map_err(BuildError::ArchiveFormat)?
            .filter_map(move |entry| {
                let mut entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => return Some(Err(BuildError::ArchiveFormat(err))),
                };
                if !entry.header().entry_type().is_file() {
                    return None;
                }
                let name = match entry.path() {
                    Ok(path) => path.to_string_lossy().into_owned(),
                    Err(err) => return Some(Err(BuildError::ArchiveFormat(err))),
                };
                if !filter.include(&name, skip_test) {
                    log::debug!("skipping archive entry {}", name);
                    return None;
                }
                let mut content = Vec::new();
                if let Err(err) = entry.read_to_end(&mut content) {
                    return Some(Err(BuildError::ArchiveFormat(err)));
                }
                Some(Ok(SourceFile { name, content }))
            });

        Ok(Self {
            location: "<archive>".into(),
            entries: Box::new(entries),
        })
    }

    /// Files held in memory, in the given order.
    pub fn ephemeral(src: Ephemeral, filter: &'a dyn FileFilter, skip_test: bool) -> Self {
        let entries = src
            .files
            .into_iter()
            .filter(move |file| filter.include(&file.name, skip_test))
            .map(Ok);

        Self {
            location: src.location,
            entries: Box::new(entries),
        }
    }

    /// Where the files come from, for diagnostics.
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Iterator for SourceSet<'_> {
    type Item = Result<SourceFile, BuildError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}

/// A tar archive read through a gzip decoder.
pub fn gzip_archive<R: Read>(reader: R) -> tar::Archive<GzDecoder<R>> {
    tar::Archive::new(GzDecoder::new(reader))
}

/// In-memory package sources.
#[derive(Clone, Debug, Default)]
pub struct Ephemeral {
    location: String,
    files: Vec<SourceFile>,
}

impl Ephemeral {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            files: Vec::new(),
        }
    }

    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push(SourceFile::new(name, content.into()));
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}
