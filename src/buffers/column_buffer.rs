use std::mem::size_of;

use crate::{Error, storage::FileSet};

/// An ordered sequence of in-memory columns. Slot `0` holds the oldest column, which is the
/// next eviction victim. The last slot holds the newest. At rest the buffer contains
/// `min(cols, max_cols)` columns and never the same column twice.
pub struct ColumnBuffer {
    slots: Vec<Slot>,
}

struct Slot {
    /// Index of the matrix column currently held by this slot.
    index: usize,
    values: Vec<f64>,
}

impl ColumnBuffer {
    pub fn new() -> Self {
        ColumnBuffer { slots: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Slot holding column `col`, if resident. Scans newest to oldest, so recently used columns
    /// win the lookup.
    pub fn position(&self, col: usize) -> Option<usize> {
        self.slots.iter().rposition(|slot| slot.index == col)
    }

    pub fn values(&self, slot: usize) -> &[f64] {
        &self.slots[slot].values
    }

    pub fn values_mut(&mut self, slot: usize) -> &mut [f64] {
        &mut self.slots[slot].values
    }

    /// Contents of the newest slot. Only meaningful right after a rotation placed a column
    /// there.
    pub fn newest_values(&self) -> &[f64] {
        &self.slots[self.slots.len() - 1].values
    }

    pub fn newest_values_mut(&mut self) -> &mut [f64] {
        let last = self.slots.len() - 1;
        &mut self.slots[last].values
    }

    /// Resident column indices together with their values, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f64])> + '_ {
        self.slots.iter().map(|slot| (slot.index, slot.values.as_slice()))
    }

    /// Snapshot of the resident column indices, oldest first.
    pub fn resident(&self) -> Vec<usize> {
        self.slots.iter().map(|slot| slot.index).collect()
    }

    /// Appends a brand new slot. Used while the buffer has not reached its capacity yet.
    pub fn push(&mut self, index: usize, values: Vec<f64>) {
        self.slots.push(Slot { index, values });
    }

    /// Drops the oldest slot and its allocation. The caller flushes beforehand if the contents
    /// may be dirty.
    pub fn drop_oldest(&mut self) {
        if !self.slots.is_empty() {
            self.slots.remove(0);
        }
    }

    /// Writes the oldest column back to its backing file.
    pub fn flush_oldest(&self, files: &FileSet) -> Result<(), Error> {
        if let Some(slot) = self.slots.first() {
            files.write_values(slot.index, 0, &slot.values)?;
        }
        Ok(())
    }

    /// Writes every resident column back to its backing file.
    pub fn flush_all(&self, files: &FileSet) -> Result<(), Error> {
        for slot in &self.slots {
            files.write_values(slot.index, 0, &slot.values)?;
        }
        Ok(())
    }

    /// Evicts the oldest column and reads `col` from its file into the reclaimed slot, which
    /// becomes the newest. The slot allocation is reused, no allocation churn.
    pub fn rotate_in(&mut self, col: usize, files: &FileSet) -> Result<(), Error> {
        self.rotate_in_nofill(col);
        let last = self.slots.len() - 1;
        files.read_values(col, 0, &mut self.slots[last].values)
    }

    /// Performs the same rotation as [`Self::rotate_in`] but does not fill the reclaimed slot,
    /// which still holds the evicted column's values. Only useful if the caller overwrites the
    /// whole slot right away.
    pub fn rotate_in_nofill(&mut self, col: usize) {
        debug_assert!(!self.slots.is_empty());
        self.slots.rotate_left(1);
        let last = self.slots.len() - 1;
        self.slots[last].index = col;
    }

    pub fn memory_in_use(&self) -> usize {
        self.slots.capacity() * size_of::<Slot>()
            + self
                .slots
                .iter()
                .map(|slot| slot.values.capacity() * size_of::<f64>())
                .sum::<usize>()
    }
}
