//! Square cell grids whose cells hold intrusive singly linked lists.
//!
//! # Layout
//!
//! ```text
//! heads[row * resolution + col] ──► slot a ──► slot b ──► NIL
//!                                    next[a]    next[b]
//! ```
//!
//! `heads` has one entry per cell, `next` one entry per item slot.  An item
//! lives in exactly one cell at a time; moving it means `remove` from the old
//! cell followed by `insert` into the new one.
//!
//! Every walk is bounded by the number of slots.  A list longer than that
//! must contain a cycle, so the walk logs an error and stops instead of
//! spinning forever on corrupted links.

use pk_core::{GridSpec, Vec3};
use tracing::error;

/// "No item" marker in `heads` and `next`.
pub const NIL: u32 = u32::MAX;

pub struct LinkedGrid {
    spec:  GridSpec,
    heads: Vec<u32>,
    next:  Vec<u32>,
}

impl LinkedGrid {
    pub fn new(spec: GridSpec) -> Self {
        Self {
            spec,
            heads: vec![NIL; spec.cell_count()],
            next:  Vec::new(),
        }
    }

    /// Pre-size the link table for `slots` items.
    pub fn with_slots(spec: GridSpec, slots: usize) -> Self {
        let mut grid = Self::new(spec);
        grid.next = vec![NIL; slots];
        grid
    }

    #[inline]
    pub fn spec(&self) -> GridSpec {
        self.spec
    }

    /// Upper bound on any valid list length.
    #[inline]
    pub fn walk_cap(&self) -> usize {
        self.next.len()
    }

    #[inline]
    fn cell_index(&self, row: u32, col: u32) -> usize {
        row as usize * self.spec.resolution as usize + col as usize
    }

    /// Clamped cell containing `pos`.
    #[inline]
    pub fn cell_at(&self, pos: Vec3) -> (u32, u32) {
        self.spec.clamped_cell_of(pos.x, pos.z)
    }

    fn ensure_slot(&mut self, slot: u32) {
        let needed = slot as usize + 1;
        if self.next.len() < needed {
            self.next.resize(needed, NIL);
        }
    }

    /// Push `slot` onto the front of cell `(row, col)`.
    pub fn insert(&mut self, slot: u32, row: u32, col: u32) {
        self.ensure_slot(slot);
        let cell = self.cell_index(row, col);
        self.next[slot as usize] = self.heads[cell];
        self.heads[cell] = slot;
    }

    /// Insert `slot` into the cell containing `pos`; returns that cell.
    pub fn insert_at(&mut self, slot: u32, pos: Vec3) -> (u32, u32) {
        let (row, col) = self.cell_at(pos);
        self.insert(slot, row, col);
        (row, col)
    }

    /// Unlink `slot` from cell `(row, col)`.  Returns `false` if it was not
    /// found there.
    pub fn remove(&mut self, slot: u32, row: u32, col: u32) -> bool {
        if slot as usize >= self.next.len() {
            return false;
        }
        let cell = self.cell_index(row, col);
        let cap = self.walk_cap();
        let mut prev = NIL;
        let mut cur = self.heads[cell];
        let mut steps = 0usize;
        let mut found = false;

        while cur != NIL {
            if cur == slot {
                let after = self.next[slot as usize];
                if prev == NIL {
                    self.heads[cell] = after;
                } else {
                    self.next[prev as usize] = after;
                }
                self.next[slot as usize] = NIL;
                found = true;
                break;
            }
            prev = cur;
            cur = self.next[cur as usize];
            steps += 1;
            if steps > cap {
                error!(row, col, cap, "invalid list detected while unlinking grid item");
                break;
            }
        }
        found
    }

    /// Unlink `slot` from the cell containing `pos`.
    pub fn remove_at(&mut self, slot: u32, pos: Vec3) -> bool {
        let (row, col) = self.cell_at(pos);
        self.remove(slot, row, col)
    }

    /// Items of cell `(row, col)`.  Out-of-range cells are empty.
    pub fn cell(&self, row: i32, col: i32) -> CellIter<'_> {
        let cur = if self.spec.contains(row, col) {
            self.heads[self.cell_index(row as u32, col as u32)]
        } else {
            NIL
        };
        CellIter { grid: self, cur, steps: 0, row, col }
    }

    /// All items in the inclusive cell rectangle.
    pub fn cells_in(
        &self,
        rows: std::ops::RangeInclusive<u32>,
        cols: std::ops::RangeInclusive<u32>,
    ) -> impl Iterator<Item = u32> + '_ {
        rows.flat_map(move |r| {
            cols.clone().flat_map(move |c| self.cell(r as i32, c as i32))
        })
    }

    /// Test hook for corrupting a link.
    #[cfg(test)]
    pub(crate) fn set_link(&mut self, slot: u32, next: u32) {
        self.ensure_slot(slot);
        self.next[slot as usize] = next;
    }
}

/// Walks one cell's list; see [`LinkedGrid::cell`].
pub struct CellIter<'a> {
    grid:  &'a LinkedGrid,
    cur:   u32,
    steps: usize,
    row:   i32,
    col:   i32,
}

impl Iterator for CellIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.cur == NIL {
            return None;
        }
        if self.steps >= self.grid.walk_cap() {
            error!(
                row = self.row,
                col = self.col,
                cap = self.grid.walk_cap(),
                "invalid list detected in grid cell",
            );
            self.cur = NIL;
            return None;
        }
        let item = self.cur;
        self.cur = self.grid.next.get(item as usize).copied().unwrap_or(NIL);
        self.steps += 1;
        Some(item)
    }
}
