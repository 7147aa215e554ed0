//! Statistics and debugging for GOOT tables
//!
//! Provides usage snapshots and failure reporting.

use super::free_list::FreeBlock;

/// GOOT usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GootStats {
    pub capacity: usize,
    pub used_slots: usize,
    pub free_slots: usize,
    pub free_blocks: usize,
    pub largest_free_block: usize,
    pub live_runs: usize,
}

impl GootStats {
    pub const fn new() -> Self {
        Self {
            capacity: 0,
            used_slots: 0,
            free_slots: 0,
            free_blocks: 0,
            largest_free_block: 0,
            live_runs: 0,
        }
    }

    /// Add statistics from another table, e.g. another page of a multi-page PLOT
    pub fn add(&mut self, other: &GootStats) {
        self.capacity += other.capacity;
        self.used_slots += other.used_slots;
        self.free_slots += other.free_slots;
        self.free_blocks += other.free_blocks;
        self.largest_free_block = self.largest_free_block.max(other.largest_free_block);
        self.live_runs += other.live_runs;
    }

    /// Share of free entries that lie outside the largest free block, in percent.
    pub fn fragmentation_percent(&self) -> usize {
        if self.free_slots == 0 {
            return 0;
        }
        (self.free_slots - self.largest_free_block) * 100 / self.free_slots
    }
}

/// Detailed table state reporter
pub struct GootStatsReporter;

impl GootStatsReporter {
    /// Print the free layout after an insert found no run long enough
    #[allow(unused_variables)]
    pub fn print_insert_failure_stats(
        stats: &GootStats,
        blocks: impl Iterator<Item = FreeBlock>,
        request: usize,
    ) {
        #[cfg(feature = "log")]
        use log::error;
        error!("========================================");
        error!("Request: {} contiguous entries", request);
        error!(
            "  Entries: {} total, {} used, {} free",
            stats.capacity, stats.used_slots, stats.free_slots
        );
        error!(
            "  Free blocks: {} (largest {}, {}% fragmented)",
            stats.free_blocks,
            stats.largest_free_block,
            stats.fragmentation_percent()
        );
        error!("  Live runs: {}", stats.live_runs);
        for block in blocks {
            error!(
                "    [{}, {}] {} entries",
                block.start,
                block.end,
                block.len()
            );
        }
        error!("========================================");
    }
}
