//! GOOT shared between writers.
//!
//! The table itself never synchronises. Module load and unload paths that
//! may race wrap it here, so every multi-cell update runs under one lock.

use crate::goot::{GootTable, Resolved};
use crate::{GootResult, SlotOwner, DEFAULT_GOOT_ENTRIES};
use kspin::SpinNoIrq;

#[cfg(feature = "tracking")]
use crate::goot::GootStats;

/// A [`GootTable`] behind an IRQ-safe spinlock
pub struct LockedGoot<'a, H: SlotOwner, const ENTRIES: usize = DEFAULT_GOOT_ENTRIES> {
    table: SpinNoIrq<GootTable<'a, H, ENTRIES>>,
}

impl<'a, H: SlotOwner, const ENTRIES: usize> LockedGoot<'a, H, ENTRIES> {
    pub const fn new() -> Self {
        Self {
            table: SpinNoIrq::new(GootTable::new()),
        }
    }

    /// Reset the table to a single free block
    pub fn init(&self) {
        self.table.lock().init();
    }

    pub fn insert(&self, owner: &'a H) -> GootResult<usize> {
        self.table.lock().insert(owner)
    }

    pub fn remove(&self, start: usize) -> GootResult {
        self.table.lock().remove(start)
    }

    pub fn lookup(&self, index: usize) -> Option<&'a H> {
        self.table.lock().lookup(index)
    }

    pub fn resolve(&self, index: usize) -> Option<Resolved<'a, H>> {
        self.table.lock().resolve(index)
    }

    pub fn first_free(&self) -> Option<usize> {
        self.table.lock().first_free()
    }

    pub fn free_slots(&self) -> usize {
        self.table.lock().free_slots()
    }

    pub fn used_slots(&self) -> usize {
        self.table.lock().used_slots()
    }

    pub fn verify(&self) -> GootResult {
        self.table.lock().verify()
    }

    /// Address of the table's first word; stable while `self` is not moved.
    pub fn as_ptr(&self) -> *const usize {
        self.table.lock().as_ptr()
    }

    /// Run `f` with the table locked.
    pub fn with_table<R>(&self, f: impl FnOnce(&mut GootTable<'a, H, ENTRIES>) -> R) -> R {
        f(&mut *self.table.lock())
    }

    /// Get table statistics
    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> GootStats {
        self.table.lock().get_stats()
    }
}

impl<H: SlotOwner, const ENTRIES: usize> Default for LockedGoot<'_, H, ENTRIES> {
    fn default() -> Self {
        Self::new()
    }
}
