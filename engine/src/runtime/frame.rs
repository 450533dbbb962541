//! Shared storage for global bindings.
use parking_lot::{Mutex, MutexGuard};

/// Global slots shared by every package built against the same [`Globals`](super::registry::Globals).
///
/// The frame only grows. Slots are addressed by the index a language assigned during its
/// declaration pass.
#[derive(Debug, Default)]
pub struct Frame<V> {
    data: Mutex<Vec<V>>,
}

impl<V: Clone + Default> Frame<V> {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(Vec::new()),
        }
    }

    /// Lock the frame for a sequence of reads and writes.
    pub fn lock(&self) -> MutexGuard<'_, Vec<V>> {
        self.data.lock()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<V> {
        self.data.lock().get(slot).cloned()
    }

    /// Store `value` in `slot`, returning `false` if the slot does not exist.
    pub fn set(&self, slot: usize, value: V) -> bool {
        match self.data.lock().get_mut(slot) {
            Some(current) => {
                *current = value;
                true
            }
            None => false,
        }
    }
}

/// Grow `data` to hold `slots` entries. Existing values are kept.
pub(crate) fn grow<V: Clone + Default>(data: &mut Vec<V>, slots: usize) {
    if data.len() < slots {
        log::debug!("growing frame from {} to {} slots", data.len(), slots);
        data.resize(slots, V::default());
    }
}
