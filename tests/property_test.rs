//! Property-based tests for the GOOT allocator.
//!
//! Uses proptest to drive random load/unload sequences and compares the
//! table against a plain per-cell model.

use goot_allocator::{GootError, GootTable, SlotOwner};
use proptest::prelude::*;

const CAPACITY: usize = 24;

#[derive(Debug)]
struct Handle {
    got_entries: usize,
}

impl SlotOwner for Handle {
    fn slot_count(&self) -> usize {
        self.got_entries
    }
}

#[derive(Debug, Clone)]
enum Op {
    /// Load the handle with this index in the pool.
    Insert(usize),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0usize..8).prop_map(Op::Insert),
        2 => any::<usize>().prop_map(Op::Remove),
    ]
}

/// First-fit over maximal free runs, carving from the front.
fn model_fit(cells: &[Option<usize>], count: usize) -> Option<usize> {
    let mut index = 0;
    while index < cells.len() {
        if cells[index].is_some() {
            index += 1;
            continue;
        }
        let start = index;
        while index < cells.len() && cells[index].is_none() {
            index += 1;
        }
        if index - start >= count {
            return Some(start);
        }
    }
    None
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, ..ProptestConfig::default() })]

    #[test]
    fn prop_matches_first_fit_model(ops in prop::collection::vec(op(), 1..64)) {
        let pool: Vec<Handle> = (1..=8).map(|got_entries| Handle { got_entries }).collect();
        let mut table = GootTable::<Handle, CAPACITY>::new();
        let mut cells: Vec<Option<usize>> = vec![None; CAPACITY];
        let mut live: Vec<(usize, usize)> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(id) => {
                    let handle = &pool[id];
                    let expected = model_fit(&cells, handle.got_entries);
                    match table.insert(handle) {
                        Ok(start) => {
                            prop_assert_eq!(Some(start), expected);
                            for cell in &mut cells[start..start + handle.got_entries] {
                                *cell = Some(id);
                            }
                            live.push((start, id));
                        }
                        Err(err) => {
                            prop_assert_eq!(err, GootError::NoSpace);
                            prop_assert_eq!(expected, None);
                        }
                    }
                }
                Op::Remove(pick) => {
                    if live.is_empty() {
                        prop_assert!(table.remove(0).is_err());
                        continue;
                    }
                    let (start, id) = live.swap_remove(pick % live.len());
                    prop_assert_eq!(table.remove(start), Ok(()));
                    for cell in &mut cells[start..start + pool[id].got_entries] {
                        *cell = None;
                    }
                }
            }

            prop_assert!(table.verify().is_ok());
            for (index, cell) in cells.iter().enumerate() {
                match cell {
                    Some(id) => prop_assert!(core::ptr::eq(table.lookup(index).unwrap(), &pool[*id])),
                    None => prop_assert!(table.lookup(index).is_none()),
                }
            }
            let free = cells.iter().filter(|cell| cell.is_none()).count();
            prop_assert_eq!(table.free_slots(), free);
            prop_assert_eq!(table.first_free(), cells.iter().position(|cell| cell.is_none()));
        }
    }

    #[test]
    fn prop_unload_all_restores_single_block(sizes in prop::collection::vec(1usize..6, 1..12)) {
        let pool: Vec<Handle> = sizes.iter().map(|&got_entries| Handle { got_entries }).collect();
        let mut table = GootTable::<Handle, CAPACITY>::new();
        let starts: Vec<usize> = pool.iter().filter_map(|handle| table.insert(handle).ok()).collect();

        for start in starts.into_iter().rev() {
            prop_assert_eq!(table.remove(start), Ok(()));
        }
        prop_assert_eq!(table.free_blocks().count(), 1);
        prop_assert_eq!(table.free_slots(), CAPACITY);
        prop_assert_eq!(table.first_free(), Some(0));
    }
}
