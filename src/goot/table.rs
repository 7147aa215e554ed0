//! Fixed-capacity GOOT with contiguous run allocation
//!
//! Each loaded module owns one contiguous run of cells, sized by its
//! [`SlotOwner::slot_count`], because trampoline code addresses the run
//! through a single per-module base offset. Runs are carved first-fit from
//! the front of free blocks and merged back into their neighbours on removal.

use core::marker::PhantomData;

use crate::{GootError, GootResult, SlotOwner, DEFAULT_GOOT_ENTRIES};

#[cfg(feature = "log")]
use log::{debug, error, warn};

use super::entry::{GootEntry, SENTINEL};
use super::free_list::{self, FreeBlock, FreeBlocks};

/// Location of a cell inside its owner's run.
#[derive(Debug)]
pub struct Resolved<'a, H> {
    pub owner: &'a H,
    /// Table index of the run's first cell.
    pub base: usize,
    /// Position of the cell within the run, i.e. the owner's own GOT index.
    pub offset: usize,
}

/// A Global Offset Override Table
///
/// The layout is shared with trampoline code: the first word is the index of
/// the first free cell (or all ones when full), followed by `ENTRIES`
/// one-word cells. Owners are borrowed for `'a`; the table never owns them.
///
/// No operation synchronises. Writers need `&mut self`; see
/// [`LockedGoot`](crate::LockedGoot) for a table shared between writers.
#[repr(C)]
pub struct GootTable<'a, H: SlotOwner, const ENTRIES: usize = DEFAULT_GOOT_ENTRIES> {
    first_free: usize,
    entries: [GootEntry; ENTRIES],
    _owners: PhantomData<&'a H>,
}

impl<'a, H: SlotOwner, const ENTRIES: usize> GootTable<'a, H, ENTRIES> {
    const LAYOUT_CHECK: () = {
        assert!(ENTRIES >= 1, "a GOOT needs at least one entry");
        assert!(ENTRIES < SENTINEL, "GOOT capacity collides with the sentinel");
        assert!(
            core::mem::align_of::<H>() >= 2,
            "owner records must leave bit 0 of their address clear"
        );
    };

    /// Create a table holding a single free block that spans every cell.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::LAYOUT_CHECK;

        let mut entries = [GootEntry::free(Some(ENTRIES - 1)); ENTRIES];
        entries[ENTRIES - 1] = GootEntry::free(None);
        Self {
            first_free: 0,
            entries,
            _owners: PhantomData,
        }
    }

    /// Reset the table to a single free block, dropping every run.
    pub fn init(&mut self) {
        free_list::write_block(&mut self.entries, 0, ENTRIES - 1, None);
        self.first_free = 0;
    }

    pub const fn capacity(&self) -> usize {
        ENTRIES
    }

    /// Index of the first free cell, `None` when the table is full.
    pub const fn first_free(&self) -> Option<usize> {
        free_list::decode_index(self.first_free)
    }

    pub const fn is_full(&self) -> bool {
        self.first_free().is_none()
    }

    pub fn entry(&self, index: usize) -> Option<GootEntry> {
        self.entries.get(index).copied()
    }

    pub fn entries(&self) -> &[GootEntry] {
        &self.entries
    }

    /// Address of the table's first word, as handed to trampoline code.
    pub fn as_ptr(&self) -> *const usize {
        self as *const Self as *const usize
    }

    /// Free blocks in list order.
    pub fn free_blocks(&self) -> FreeBlocks<'_> {
        FreeBlocks::new(&self.entries, self.first_free())
    }

    pub fn free_slots(&self) -> usize {
        self.free_blocks().map(|block| block.len()).sum()
    }

    pub fn used_slots(&self) -> usize {
        ENTRIES - self.free_slots()
    }

    /// Owner referenced by the cell at `index`, if it is allocated.
    ///
    /// Reads only that cell, so it never depends on free-list state.
    pub fn lookup(&self, index: usize) -> Option<&'a H> {
        let addr = self.entries.get(index)?.owner_addr()?;
        // SAFETY: allocated cells are only written by `insert`, from an `&'a H`.
        Some(unsafe { &*(addr as *const H) })
    }

    /// Translate a table index into its owner, run base and offset within the run.
    pub fn resolve(&self, index: usize) -> Option<Resolved<'a, H>> {
        let owner = self.lookup(index)?;
        let count = owner.slot_count();
        if count == 0 {
            return None;
        }
        let offset = self.same_owner_before(index) % count;
        Some(Resolved {
            owner,
            base: index - offset,
            offset,
        })
    }

    /// Count the cells directly before `index` that hold the same owner.
    ///
    /// One owner may hold several adjacent runs, so run boundaries fall on
    /// multiples of its slot count.
    fn same_owner_before(&self, index: usize) -> usize {
        let entry = self.entries[index];
        self.entries[..index]
            .iter()
            .rev()
            .take_while(|cell| **cell == entry)
            .count()
    }

    /// Reserve a contiguous run for `owner`, returning its first index.
    ///
    /// Walks the free blocks in order and carves the run from the front of the
    /// first block that is long enough. Any remainder stays in place as a
    /// smaller block.
    pub fn insert(&mut self, owner: &'a H) -> GootResult<usize> {
        let count = owner.slot_count();
        if count == 0 {
            warn!("GOOT: refusing to insert an owner that needs no entries");
            return Err(GootError::InvalidParam);
        }

        let mut pred_end = None;
        let mut found = None;
        for block in self.free_blocks() {
            if block.len() >= count {
                found = Some(block);
                break;
            }
            pred_end = Some(block.end);
        }

        let block = match found {
            Some(block) => block,
            None => {
                warn!(
                    "GOOT: no contiguous run of {} entries ({} of {} free)",
                    count,
                    self.free_slots(),
                    ENTRIES
                );
                self.print_insert_failure_stats(count);
                return Err(GootError::NoSpace);
            }
        };

        let start = block.start;
        let entry = GootEntry::allocated(owner);
        for cell in &mut self.entries[start..start + count] {
            debug_assert!(cell.is_free());
            *cell = entry;
        }

        // The remainder's markers already point at the old block end and successor.
        let successor = if block.len() > count {
            Some(start + count)
        } else {
            block.next
        };
        free_list::relink(&mut self.first_free, &mut self.entries, pred_end, successor);

        debug!(
            "GOOT: inserted {} entries at [{}, {}]",
            count,
            start,
            start + count - 1
        );
        Ok(start)
    }

    /// [`insert`](Self::insert) reduced to success or failure.
    pub fn try_insert(&mut self, owner: &'a H) -> bool {
        self.insert(owner).is_ok()
    }

    /// Release the run whose first cell is `start`.
    ///
    /// The run length is recovered from its owner. The freed cells are merged
    /// with any address-contiguous free block on either side.
    pub fn remove(&mut self, start: usize) -> GootResult {
        if start >= ENTRIES {
            error!(
                "GOOT: index {} out of range (capacity {})",
                start, ENTRIES
            );
            return Err(GootError::InvalidParam);
        }

        let owner = match self.lookup(start) {
            Some(owner) => owner,
            None => {
                error!("GOOT: entry {} is not allocated", start);
                return Err(GootError::NotAllocated);
            }
        };

        let count = owner.slot_count();
        if count == 0 || self.same_owner_before(start) % count != 0 {
            error!("GOOT: entry {} is not the start of a run", start);
            return Err(GootError::NotAllocated);
        }

        let end = start + count - 1;
        debug_assert!(
            end < ENTRIES,
            "GOOT: run at {} of {} entries overflows the table",
            start,
            count
        );
        debug_assert!(
            self.entries[start..=end]
                .iter()
                .all(|cell| *cell == self.entries[start]),
            "GOOT: run at {} disagrees on its owner",
            start
        );

        let mut prev: Option<FreeBlock> = None;
        let mut following: Option<FreeBlock> = None;
        for block in self.free_blocks() {
            if block.start > start {
                following = Some(block);
                break;
            }
            prev = Some(block);
        }

        let merged_start = match prev {
            Some(block) if block.end + 1 == start => block.start,
            _ => start,
        };
        let (merged_end, successor) = match following {
            Some(block) if block.start == end + 1 => (block.end, block.next),
            Some(block) => (end, Some(block.start)),
            None => (end, None),
        };
        free_list::write_block(&mut self.entries, merged_start, merged_end, successor);

        // Merging into the preceding block keeps that block's incoming link.
        if merged_start == start {
            free_list::relink(
                &mut self.first_free,
                &mut self.entries,
                prev.map(|block| block.end),
                Some(start),
            );
        }

        debug!(
            "GOOT: removed {} entries at [{}, {}], free block now [{}, {}]",
            count, start, end, merged_start, merged_end
        );
        Ok(())
    }

    /// [`remove`](Self::remove) reduced to success or failure.
    pub fn try_remove(&mut self, start: usize) -> bool {
        self.remove(start).is_ok()
    }

    /// Check every structural invariant of the table.
    pub fn verify(&self) -> GootResult {
        if let Some(head) = self.first_free() {
            if head >= ENTRIES || !self.entries[head].is_free() {
                error!("GOOT: first_free {} is not a free entry", head);
                return Err(GootError::Corrupted);
            }
        }

        let mut listed = 0;
        let mut last_end: Option<usize> = None;
        for block in self.free_blocks() {
            if let Some(prev_end) = last_end {
                if block.start <= prev_end + 1 {
                    error!(
                        "GOOT: block at {} not after previous block end {} with a gap",
                        block.start, prev_end
                    );
                    return Err(GootError::Corrupted);
                }
            }
            if block.start > 0 && self.entries[block.start - 1].is_free() {
                error!("GOOT: block at {} is not maximal", block.start);
                return Err(GootError::Corrupted);
            }
            if self.entries[block.start..block.end]
                .iter()
                .any(|cell| cell.next_free() != Some(block.end))
            {
                error!(
                    "GOOT: block [{}, {}] has a stale interior marker",
                    block.start, block.end
                );
                return Err(GootError::Corrupted);
            }
            if let Some(next) = block.next {
                if next <= block.end + 1 || next >= ENTRIES || !self.entries[next].is_free() {
                    error!(
                        "GOOT: block [{}, {}] links to invalid successor {}",
                        block.start, block.end, next
                    );
                    return Err(GootError::Corrupted);
                }
            }
            listed += block.len();
            last_end = Some(block.end);
        }

        let free_cells = self.entries.iter().filter(|cell| cell.is_free()).count();
        if listed != free_cells {
            error!(
                "GOOT: free list reaches {} entries but {} are free",
                listed, free_cells
            );
            return Err(GootError::Corrupted);
        }
        if (free_cells == 0) != self.is_full() {
            error!("GOOT: first_free disagrees with {} free entries", free_cells);
            return Err(GootError::Corrupted);
        }

        let mut index = 0;
        while index < ENTRIES {
            let owner = match self.lookup(index) {
                Some(owner) => owner,
                None => {
                    index += 1;
                    continue;
                }
            };
            let count = owner.slot_count();
            let entry = self.entries[index];
            if count == 0
                || index + count > ENTRIES
                || self.entries[index..index + count]
                    .iter()
                    .any(|cell| *cell != entry)
            {
                error!(
                    "GOOT: run at {} does not match its owner's {} entries",
                    index, count
                );
                return Err(GootError::Corrupted);
            }
            index += count;
        }

        Ok(())
    }

    /// Number of live runs, counting adjacent runs of one owner separately.
    pub fn live_runs(&self) -> usize {
        let mut runs = 0;
        let mut index = 0;
        while index < ENTRIES {
            match self.lookup(index) {
                Some(owner) => {
                    runs += 1;
                    index += owner.slot_count().max(1);
                }
                None => index += 1,
            }
        }
        runs
    }

    /// Get statistics for this table
    #[cfg(feature = "tracking")]
    pub fn get_stats(&self) -> super::stats::GootStats {
        let mut stats = super::stats::GootStats::new();
        stats.capacity = ENTRIES;
        for block in self.free_blocks() {
            stats.free_slots += block.len();
            stats.free_blocks += 1;
            stats.largest_free_block = stats.largest_free_block.max(block.len());
        }
        stats.used_slots = ENTRIES - stats.free_slots;
        stats.live_runs = self.live_runs();
        stats
    }

    #[cfg(feature = "tracking")]
    fn print_insert_failure_stats(&self, request: usize) {
        super::stats::GootStatsReporter::print_insert_failure_stats(
            &self.get_stats(),
            self.free_blocks(),
            request,
        );
    }

    #[cfg(not(feature = "tracking"))]
    fn print_insert_failure_stats(&self, _request: usize) {
        // No-op when tracking is disabled
    }
}

impl<H: SlotOwner, const ENTRIES: usize> Default for GootTable<'_, H, ENTRIES> {
    fn default() -> Self {
        Self::new()
    }
}
