// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generational cell storage.

use alloc::vec::Vec;

use crate::cell::Cell;

/// Identifier for a cell in a [`Model`](crate::Model).
///
/// This is a small, copyable handle that stays stable across updates but
/// becomes invalid when the underlying slot is reused. It consists of a slot
/// index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On free, the slot is released; any existing `CellId` that pointed to that
///   slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new,
///   distinct `CellId`.
///
/// Stale `CellId`s never alias a different live cell because the generation
/// must match. Note that detaching a cell from the tree does *not* free its
/// slot; the cell stays addressable so that an [`UndoableEdit`](crate::UndoableEdit)
/// can re-attach it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CellId(pub(crate) u32, pub(crate) u32);

impl CellId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    cell: Option<Cell>,
}

/// Slot arena owning every [`Cell`] of one model.
#[derive(Clone, Debug, Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, cell: Cell) -> CellId {
        if let Some(idx) = self.free.pop() {
            let slot = &mut self.slots[idx as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.cell = Some(cell);
            CellId::new(idx, slot.generation)
        } else {
            let idx = u32::try_from(self.slots.len()).expect("slot index overflow");
            self.slots.push(Slot {
                generation: 1,
                cell: Some(cell),
            });
            CellId::new(idx, 1)
        }
    }

    pub(crate) fn free(&mut self, id: CellId) -> Option<Cell> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        let cell = slot.cell.take();
        if cell.is_some() {
            self.free.push(id.0);
        }
        cell
    }

    pub(crate) fn get(&self, id: CellId) -> Option<&Cell> {
        let slot = self.slots.get(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.cell.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: CellId) -> Option<&mut Cell> {
        let slot = self.slots.get_mut(id.idx())?;
        if slot.generation != id.1 {
            return None;
        }
        slot.cell.as_mut()
    }

    pub(crate) fn is_alive(&self, id: CellId) -> bool {
        self.get(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut arena = Arena::new();
        let a = arena.insert(Cell::new_vertex());
        let b = arena.insert(Cell::new_vertex());
        assert_ne!(a, b);
        assert!(arena.is_alive(a));
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn freed_slots_are_stale_and_reused_with_new_generation() {
        let mut arena = Arena::new();
        let a = arena.insert(Cell::new_vertex());
        assert!(arena.free(a).is_some());
        assert!(!arena.is_alive(a));

        let b = arena.insert(Cell::new_vertex());
        // Slot index is reused, but the handle differs by generation.
        assert_eq!(a.0, b.0);
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
        assert!(arena.get(b).is_some());
    }

    #[test]
    fn double_free_is_a_no_op() {
        let mut arena = Arena::new();
        let a = arena.insert(Cell::new_vertex());
        assert!(arena.free(a).is_some());
        assert!(arena.free(a).is_none());
    }
}
