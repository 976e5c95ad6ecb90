//! Single-slot copy-on-write mailbox.
//!
//! The bridge delivery thread writes, task callables on worker threads read.
//! Writers never mutate a value readers may hold: every write installs a new
//! `Arc<T>`, so a reader keeps a consistent snapshot for as long as it needs
//! one, without holding any lock while it computes.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread-safe slot holding the latest immutable snapshot.
pub struct SnapshotMailbox<T> {
    slot: RwLock<Slot<T>>,
}

struct Slot<T> {
    version: u64,
    value: Option<Arc<T>>,
}

impl<T> Default for SnapshotMailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotMailbox<T> {
    /// Empty mailbox at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(Slot {
                version: 0,
                value: None,
            }),
        }
    }

    /// Replace the snapshot. Returns the new version.
    pub fn publish(&self, value: T) -> u64 {
        self.publish_arc(Arc::new(value))
    }

    /// Replace the snapshot with an already shared value. Returns the new version.
    pub fn publish_arc(&self, value: Arc<T>) -> u64 {
        let mut slot = self.slot.write();
        slot.version += 1;
        slot.value = Some(value);
        slot.version
    }

    /// Derive the next snapshot from the current one. Returns the new version.
    ///
    /// `f` runs under the write lock, so concurrent updates never lose writes.
    pub fn update<F>(&self, f: F) -> u64
    where
        F: FnOnce(Option<&T>) -> T,
    {
        let mut slot = self.slot.write();
        let next = f(slot.value.as_deref());
        slot.version += 1;
        slot.value = Some(Arc::new(next));
        slot.version
    }

    /// Latest snapshot, if any.
    #[must_use]
    pub fn latest(&self) -> Option<Arc<T>> {
        self.slot.read().value.clone()
    }

    /// Latest snapshot together with its version.
    #[must_use]
    pub fn latest_versioned(&self) -> (u64, Option<Arc<T>>) {
        let slot = self.slot.read();
        (slot.version, slot.value.clone())
    }

    /// Number of writes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.read().version
    }

    /// Drop the snapshot. The version still advances.
    pub fn clear(&self) -> u64 {
        let mut slot = self.slot.write();
        slot.version += 1;
        slot.value = None;
        slot.version
    }
}

impl<T> fmt::Debug for SnapshotMailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("SnapshotMailbox")
            .field("version", &slot.version)
            .field("occupied", &slot.value.is_some())
            .finish()
    }
}
