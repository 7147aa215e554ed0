//! Global Offset Override Table allocator
//!
//! This crate manages the slots of a GOOT, the shadow indirection table read by
//! trampoline code to redirect symbol references of (re)loadable code modules,
//! featuring:
//! - One-word cells tagged by bit 0 as free bookkeeping or a borrowed owner reference
//! - A free list compressed to one hop per free block
//! - First-fit contiguous runs, one per module, with merging on removal
//! - An optional spinlock wrapper for tables shared between writers

#![no_std]

extern crate alloc;

// Logging support - conditionally import log crate
#[cfg(feature = "log")]
extern crate log;

// Stub macros when log is disabled - these become no-ops
#[cfg(not(feature = "log"))]
macro_rules! error {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! warn {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! info {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}
#[cfg(not(feature = "log"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Number of cells in a table when no capacity is given.
///
/// One cell per trampoline entry of a single 4KB PLOT code page.
pub const DEFAULT_GOOT_ENTRIES: usize = 512;

/// The error type used by table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GootError {
    /// Invalid argument (e.g. index out of range, zero-sized owner).
    InvalidParam,
    /// No contiguous free run is long enough for the owner.
    NoSpace,
    /// The index does not address the first cell of a live run.
    NotAllocated,
    /// The table failed a structural consistency check.
    Corrupted,
}

/// A [`Result`] type with [`GootError`] as the error type.
pub type GootResult<T = ()> = Result<T, GootError>;

/// The module-handle record that owns a run of table cells.
///
/// Implementors are referenced, never owned, by the table. Their alignment must
/// be at least 2 so that bit 0 of their address is free for the cell tag.
pub trait SlotOwner {
    /// Number of contiguous cells this module requires.
    ///
    /// Must stay the same for as long as the module holds a run in any table.
    fn slot_count(&self) -> usize;
}

pub mod goot;
#[cfg(feature = "tracking")]
pub use goot::{GootStats, GootStatsReporter};
pub use goot::{FreeBlock, FreeBlocks, GootEntry, GootTable, Resolved, Slot, FREE_TAG, SENTINEL};

pub mod locked;
pub use locked::LockedGoot;
