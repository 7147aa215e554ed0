//! Table cell encoding
//!
//! Every cell is one machine word. Bit 0 tells the two states apart:
//! - set: the cell is free and bits 1.. hold the `next` marker (an index or [`SENTINEL`])
//! - clear: the cell is allocated and the whole word is the owner's address
//!
//! Trampoline code reads these words directly, so the layout is fixed.

use core::fmt;

/// Tag bit marking a free cell.
pub const FREE_TAG: usize = 0x1;

/// Marker meaning "no such index": all ones of the index width.
pub const SENTINEL: usize = usize::MAX >> 1;

/// Decoded view of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Free cell; `next` is `None` when the marker is the sentinel.
    Free { next: Option<usize> },
    /// Allocated cell holding the owner's address.
    Allocated { owner: usize },
}

/// One raw table cell.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GootEntry(usize);

impl GootEntry {
    /// A free cell whose marker is `next`, or the sentinel for `None`.
    pub const fn free(next: Option<usize>) -> Self {
        let marker = match next {
            Some(index) => {
                debug_assert!(index < SENTINEL);
                index
            }
            None => SENTINEL,
        };
        Self((marker << 1) | FREE_TAG)
    }

    /// An allocated cell referencing `owner`.
    pub fn allocated<H>(owner: &H) -> Self {
        let addr = owner as *const H as usize;
        debug_assert!(
            addr & FREE_TAG == 0,
            "owner address {:#x} collides with the free tag",
            addr
        );
        Self(addr)
    }

    /// Rebuild a cell from its raw word.
    pub const fn from_raw(word: usize) -> Self {
        Self(word)
    }

    /// The raw word as trampoline code sees it.
    pub const fn raw(self) -> usize {
        self.0
    }

    pub const fn is_free(self) -> bool {
        self.0 & FREE_TAG != 0
    }

    pub const fn is_allocated(self) -> bool {
        !self.is_free()
    }

    /// The `next` marker of a free cell; `None` for the sentinel or an allocated cell.
    pub const fn next_free(self) -> Option<usize> {
        if !self.is_free() {
            return None;
        }
        match self.0 >> 1 {
            SENTINEL => None,
            index => Some(index),
        }
    }

    /// The owner address of an allocated cell.
    pub const fn owner_addr(self) -> Option<usize> {
        if self.is_free() {
            None
        } else {
            Some(self.0)
        }
    }

    pub const fn decode(self) -> Slot {
        if self.is_free() {
            Slot::Free {
                next: self.next_free(),
            }
        } else {
            Slot::Allocated { owner: self.0 }
        }
    }
}

impl From<Slot> for GootEntry {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Free { next } => Self::free(next),
            Slot::Allocated { owner } => {
                debug_assert!(owner & FREE_TAG == 0);
                Self(owner)
            }
        }
    }
}

impl fmt::Debug for GootEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Slot::Free { next: Some(next) } => write!(f, "Free(next={})", next),
            Slot::Free { next: None } => f.write_str("Free(end)"),
            Slot::Allocated { owner } => write!(f, "Allocated({:#x})", owner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(8))]
    struct Dummy(#[allow(dead_code)] u64);

    #[test]
    fn test_free_entry_layout() {
        let entry = GootEntry::free(Some(5));
        assert_eq!(entry.raw(), 0b1011);
        assert!(entry.is_free());
        assert_eq!(entry.next_free(), Some(5));
        assert_eq!(entry.owner_addr(), None);
    }

    #[test]
    fn test_sentinel_is_all_ones() {
        let entry = GootEntry::free(None);
        assert_eq!(entry.raw(), usize::MAX);
        assert_eq!(entry.next_free(), None);
        assert_eq!(entry.decode(), Slot::Free { next: None });
    }

    #[test]
    fn test_allocated_entry_is_plain_address() {
        let owner = Dummy(7);
        let entry = GootEntry::allocated(&owner);
        assert_eq!(entry.raw(), &owner as *const Dummy as usize);
        assert!(entry.is_allocated());
        assert_eq!(entry.next_free(), None);
        assert_eq!(
            entry.decode(),
            Slot::Allocated {
                owner: &owner as *const Dummy as usize
            }
        );
    }

    #[test]
    fn test_slot_conversion() {
        let entry = GootEntry::from(Slot::Free { next: Some(0) });
        assert_eq!(entry, GootEntry::free(Some(0)));
        assert_eq!(GootEntry::from_raw(entry.raw()).decode(), Slot::Free { next: Some(0) });
    }
}
