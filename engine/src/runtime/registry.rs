//! Package state shared by interpreter sessions, and the per-session cycle guard.
//!
//! Lock order is always registry, then frame.
use crate::runtime::frame::{self, Frame};
use crate::runtime::{BuildError, PackageRecord};
use parking_lot::{Mutex, MutexGuard};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Packages built so far, keyed by import path.
#[derive(Debug, Default)]
pub struct PackageRegistry {
    packages: HashMap<String, Arc<PackageRecord>>,
}

impl PackageRegistry {
    pub fn lookup(&self, import_path: &str) -> Option<Arc<PackageRecord>> {
        self.packages.get(import_path).cloned()
    }

    /// Register `record` for `import_path`. A path is registered once; a second registration
    /// returns the first record.
    pub fn register(&mut self, import_path: &str, record: PackageRecord) -> Arc<PackageRecord> {
        if let Some(existing) = self.packages.get(import_path) {
            log::warn!("package {} is already registered", import_path);
            return existing.clone();
        }
        let record = Arc::new(record);
        self.packages.insert(import_path.to_string(), record.clone());
        record
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Import paths whose import has started within one session.
///
/// A cycle only exists within one depth-first import chain, so each session keeps its own
/// guard. Entries are never removed: a completed import is found in the [`PackageRegistry`]
/// first, and a failed import stays marked.
#[derive(Debug, Default)]
pub struct CycleGuard {
    visiting: HashSet<String>,
}

impl CycleGuard {
    pub fn begin(&mut self, import_path: &str) -> Result<(), BuildError> {
        if !self.visiting.insert(import_path.to_string()) {
            return Err(BuildError::ImportCycle(import_path.to_string()));
        }
        Ok(())
    }
}

/// The lock-guarded context shared by every session of one interpreter.
#[derive(Debug, Default)]
pub struct Globals<V> {
    registry: Mutex<PackageRegistry>,
    frame: Frame<V>,
}

impl<V: Clone + Default> Globals<V> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(PackageRegistry::default()),
            frame: Frame::new(),
        }
    }

    pub fn registry(&self) -> MutexGuard<'_, PackageRegistry> {
        self.registry.lock()
    }

    pub fn frame(&self) -> &Frame<V> {
        &self.frame
    }

    pub fn lookup(&self, import_path: &str) -> Option<Arc<PackageRecord>> {
        self.registry.lock().lookup(import_path)
    }

    /// Register a built package and grow the frame to `slots`, holding the registry lock
    /// while the frame lock is taken.
    pub fn register(
        &self,
        import_path: &str,
        record: PackageRecord,
        slots: usize,
    ) -> Arc<PackageRecord> {
        let mut registry = self.registry.lock();
        let record = registry.register(import_path, record);
        let mut data = self.frame.lock();
        frame::grow(&mut data, slots);
        drop(data);
        drop(registry);
        record
    }
}
