#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use sprig_engine::lang::builder::Builder;
use sprig_engine::runtime::config::BuildConfig;
use sprig_engine::test::{Recorder, Toy};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A throwaway workspace with sources below `<root>/src`.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_logger();
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn src(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    /// Write `content` to `src/<path>`, creating parent directories.
    pub fn file(&self, path: &str, content: &str) -> &Self {
        let path = self.src().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn config(&self) -> BuildConfig {
        BuildConfig {
            os: "linux".into(),
            arch: "amd64".into(),
            ..BuildConfig::new(self.root())
        }
    }

    pub fn builder(&self) -> (Builder<Toy>, Recorder) {
        let toy = Toy::new();
        let recorder = toy.recorder();
        (Builder::new(toy, self.config()), recorder)
    }
}

/// Current value of global `name` of a registered package.
pub fn value(builder: &Builder<Toy>, import_path: &str, name: &str) -> Option<i64> {
    let record = builder.lookup(import_path)?;
    let slot = record.symbols.get(name)?.slot?;
    builder.globals().frame().get(slot)
}

/// Gzip-compressed tar of regular files.
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}
