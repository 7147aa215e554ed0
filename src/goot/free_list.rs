//! Block-compressed free list overlaid on the table cells
//!
//! Free cells form maximal runs ("blocks"), kept in ascending index order.
//! Inside a block every cell but the last marks the block's last index; the
//! last cell marks the first index of the next block, or the sentinel. Any
//! free cell therefore knows where its block ends in O(1), and walking the
//! list costs one hop per block rather than one per cell.

#[cfg(feature = "log")]
use log::error;

use super::entry::GootEntry;

/// A maximal run of free cells, `[start, end]` inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeBlock {
    pub start: usize,
    pub end: usize,
    /// First index of the next block in list order.
    pub next: Option<usize>,
}

impl FreeBlock {
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Last index of the free block containing the free cell at `index`.
///
/// A cell followed by another free cell is not the block's last one, so its
/// marker is the block end. Otherwise the cell is the end itself.
pub(crate) fn run_end(entries: &[GootEntry], index: usize) -> usize {
    debug_assert!(entries[index].is_free());
    match entries.get(index + 1) {
        Some(following) if following.is_free() => {
            let end = entries[index].next_free().unwrap_or(index);
            debug_assert!(
                end > index && end < entries.len(),
                "free cell {} marks {} as its block end",
                index,
                end
            );
            end
        }
        _ => index,
    }
}

/// Decode the block whose first cell is `start`.
pub(crate) fn block_at(entries: &[GootEntry], start: usize) -> FreeBlock {
    let end = run_end(entries, start);
    FreeBlock {
        start,
        end,
        next: entries[end].next_free(),
    }
}

/// Rewrite `[start, end]` as a single free block followed by `next`.
pub(crate) fn write_block(
    entries: &mut [GootEntry],
    start: usize,
    end: usize,
    next: Option<usize>,
) {
    debug_assert!(start <= end && end < entries.len());
    for entry in &mut entries[start..end] {
        *entry = GootEntry::free(Some(end));
    }
    entries[end] = GootEntry::free(next);
}

/// Point the predecessor at `target`.
///
/// `pred_end` is the last cell of the preceding block; when there is none the
/// list head is updated instead.
pub(crate) fn relink(
    first_free: &mut usize,
    entries: &mut [GootEntry],
    pred_end: Option<usize>,
    target: Option<usize>,
) {
    match pred_end {
        Some(end) => {
            debug_assert!(entries[end].is_free());
            entries[end] = GootEntry::free(target);
        }
        None => *first_free = encode_index(target),
    }
}

/// Word stored in the list head when no cell is free: `-1`, as trampoline code tests it.
pub(crate) const EMPTY_HEAD: usize = usize::MAX;

pub(crate) const fn encode_index(index: Option<usize>) -> usize {
    match index {
        Some(index) => index,
        None => EMPTY_HEAD,
    }
}

pub(crate) const fn decode_index(word: usize) -> Option<usize> {
    if word == EMPTY_HEAD {
        None
    } else {
        Some(word)
    }
}

/// Iterator over the free blocks of a table in list order.
pub struct FreeBlocks<'t> {
    entries: &'t [GootEntry],
    cursor: Option<usize>,
    visited: usize,
}

impl<'t> FreeBlocks<'t> {
    pub(crate) fn new(entries: &'t [GootEntry], first_free: Option<usize>) -> Self {
        Self {
            entries,
            cursor: first_free,
            visited: 0,
        }
    }
}

impl Iterator for FreeBlocks<'_> {
    type Item = FreeBlock;

    fn next(&mut self) -> Option<FreeBlock> {
        let start = self.cursor?;
        if start >= self.entries.len() || !self.entries[start].is_free() {
            error!("free list links to non-free cell {}", start);
            self.cursor = None;
            return None;
        }
        if self.visited >= self.entries.len() {
            error!("Potential cycle detected in free list");
            self.cursor = None;
            return None;
        }
        self.visited += 1;

        let block = block_at(self.entries, start);
        self.cursor = block.next;
        Some(block)
    }
}
