//! GOOT slot allocator module
//!
//! This module provides the table, its cell codec and the block-compressed
//! free list threaded through the cells.

pub mod entry;
pub mod free_list;
#[cfg(feature = "tracking")]
pub mod stats;
pub mod table;

pub use entry::{GootEntry, Slot, FREE_TAG, SENTINEL};
pub use free_list::{FreeBlock, FreeBlocks};
#[cfg(feature = "tracking")]
pub use stats::{GootStats, GootStatsReporter};
pub use table::{GootTable, Resolved};
