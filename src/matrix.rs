use std::{
    mem::size_of,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{
    Error,
    buffers::{ColumnBuffer, RowBuffer},
    storage::FileSet,
};

mod bulk;
mod reduce;

/// A dense matrix of `f64` values whose backing storage lives on disk, one file per column,
/// while two bounded buffers keep the working set in memory.
///
/// The row count is set exactly once with [`Self::set_rows`] and is immutable afterwards.
/// Columns are appended one at a time with [`Self::add_column`] and start out zero filled. The
/// matrix owns its backing files and removes them when it is dropped.
///
/// Two access modes are supported. In the default column mode only the column buffer is active
/// and streaming down columns is cheap. Switching to row mode with [`Self::set_row_mode`]
/// additionally keeps a band of consecutive rows across all columns in memory, which makes
/// streaming across rows cheap, too. All operations are valid in either mode, the mode only
/// changes which access pattern avoids disk traffic.
///
/// ```
/// use disk_matrix::DiskMatrix;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dir = tempfile::tempdir()?;
///     // Buffer two columns and a band of one hundred rows at most.
///     let mut matrix = DiskMatrix::new("temp", dir.path(), 100, 2)?;
///     matrix.set_rows(10_000);
///     for _ in 0..4 {
///         matrix.add_column()?;
///     }
///     matrix.set_value(9_999, 3, 42.0)?;
///     assert_eq!(42.0, matrix.value(9_999, 3)?);
///     assert_eq!(42.0, matrix.col_sums(false)?[3]);
///     Ok(())
/// }
/// ```
pub struct DiskMatrix {
    rows: usize,
    cols: usize,
    /// Column buffer capacity in columns. At least one.
    max_cols: usize,
    /// Row buffer capacity in rows. At least one, capped at `rows` once the row count is known.
    max_rows: usize,
    columns: ColumnBuffer,
    /// `Some` while in row mode.
    band: Option<RowBuffer>,
    /// Cell currently present in both buffers whose row buffer copy may be newer.
    clash: Option<Clash>,
    read_only: bool,
    files: FileSet,
}

/// A cell which exists in both buffers at once. The row buffer holds the authoritative value
/// until the record is reconciled into the column buffer.
#[derive(Clone, Copy)]
struct Clash {
    row: usize,
    col: usize,
}

impl DiskMatrix {
    /// An empty matrix without rows or columns. Backing files are named with `prefix` and
    /// created inside `directory`, which must exist. `max_rows` and `max_cols` bound the row
    /// and column buffer and must both be at least one.
    pub fn new(
        prefix: &str,
        directory: impl Into<PathBuf>,
        max_rows: usize,
        max_cols: usize,
    ) -> Result<Self, Error> {
        if max_rows == 0 || max_cols == 0 {
            return Err(Error::InvalidBufferCapacity);
        }
        Ok(DiskMatrix {
            rows: 0,
            cols: 0,
            max_cols,
            max_rows,
            columns: ColumnBuffer::new(),
            band: None,
            clash: None,
            read_only: false,
            files: FileSet::new(prefix, directory),
        })
    }

    /// Sets the number of rows of the matrix. This can be done once only. Returns `true` if the
    /// row count has been set, `false` if it had already been set before. The row buffer
    /// capacity is capped at the row count.
    pub fn set_rows(&mut self, rows: usize) -> bool {
        if self.rows > 0 {
            return false;
        }
        self.rows = rows;
        if rows > 0 && self.max_rows > rows {
            self.max_rows = rows;
        }
        true
    }

    /// Appends one zero filled column at the right edge of the matrix. This creates a new
    /// backing file. Fails in read-only mode.
    pub fn add_column(&mut self) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        // A full buffer rotates below, so resolve any recorded clash first.
        self.reconcile_clash();
        self.files.create_column(self.rows)?;
        let col = self.cols;
        if self.columns.len() < self.max_cols {
            self.columns.push(col, vec![0.0; self.rows]);
        } else {
            self.columns.flush_oldest(&self.files)?;
            self.columns.rotate_in_nofill(col);
            self.columns.newest_values_mut().fill(0.0);
        }
        if let Some(band) = self.band.as_mut() {
            band.push_column();
        }
        self.cols += 1;
        Ok(())
    }

    /// Adjusts both buffer capacities. The observable contents of the matrix are unchanged.
    /// Shrinking the column buffer flushes and drops the oldest columns, growing it loads
    /// columns not yet resident in ascending index order. The row buffer capacity is capped at
    /// the row count; while in row mode the band is reallocated and reloaded at its current
    /// position, clamped against the bottom of the matrix.
    pub fn resize_buffer(&mut self, max_rows: usize, max_cols: usize) -> Result<(), Error> {
        self.resize_column_buffer(max_cols)?;
        self.resize_row_buffer(max_rows)
    }

    fn resize_column_buffer(&mut self, new_max: usize) -> Result<(), Error> {
        if new_max == 0 {
            return Err(Error::InvalidBufferCapacity);
        }
        self.reconcile_clash();
        if new_max < self.max_cols {
            let resident = self.columns.len();
            for _ in new_max..resident {
                if !self.read_only {
                    self.columns.flush_oldest(&self.files)?;
                }
                self.columns.drop_oldest();
            }
        } else if new_max > self.max_cols {
            // Bring the files up to date first, the band is authoritative for the rows it
            // covers and the missing columns are read from disk below.
            if !self.read_only
                && let Some(band) = &self.band
            {
                band.flush(&self.files)?;
            }
            let target = new_max.min(self.cols);
            let mut col = 0;
            while self.columns.len() < target {
                while self.columns.position(col).is_some() {
                    col += 1;
                }
                let mut values = vec![0.0; self.rows];
                self.files.read_values(col, 0, &mut values)?;
                self.columns.push(col, values);
                col += 1;
            }
        }
        self.max_cols = new_max;
        Ok(())
    }

    fn resize_row_buffer(&mut self, new_max: usize) -> Result<(), Error> {
        if new_max == 0 {
            return Err(Error::InvalidBufferCapacity);
        }
        let new_max = if self.rows > 0 {
            new_max.min(self.rows)
        } else {
            new_max
        };
        if self.band.is_none() {
            // No band is active, only the capacity changes.
            self.max_rows = new_max;
            return Ok(());
        }
        self.reconcile_clash();
        if new_max == self.max_rows {
            return Ok(());
        }
        if !self.read_only
            && let Some(band) = &self.band
        {
            band.flush(&self.files)?;
        }
        if let Some(mut band) = self.band.take() {
            let result = if new_max < self.max_rows {
                band.shrink(new_max);
                Ok(())
            } else {
                band.grow(new_max);
                let target = band.first_row();
                band.load(&self.files, target, self.rows, &self.columns)
            };
            self.band = Some(band);
            result?;
        }
        self.max_rows = new_max;
        Ok(())
    }

    /// Activates the row buffer. The band is loaded over the first rows of the matrix, with the
    /// resident columns of the column buffer copied through so no authoritative value is lost.
    /// A no-op if the matrix is already in row mode.
    pub fn set_row_mode(&mut self) -> Result<(), Error> {
        if self.band.is_some() {
            return Ok(());
        }
        let mut band = RowBuffer::new(self.cols, self.max_rows);
        band.load(&self.files, 0, self.rows, &self.columns)?;
        self.band = Some(band);
        debug!("switched to row mode, band of {} rows", self.max_rows);
        Ok(())
    }

    /// Deactivates the row buffer: reconciles any clash, writes the band back to the files and
    /// frees it. A no-op if the matrix is already in column mode.
    pub fn set_col_mode(&mut self) -> Result<(), Error> {
        if self.band.is_none() {
            return Ok(());
        }
        self.reconcile_clash();
        if !self.read_only
            && let Some(band) = &self.band
        {
            band.flush(&self.files)?;
        }
        self.band = None;
        debug!("switched to column mode");
        Ok(())
    }

    /// While read-only, nothing is ever written back to disk and the buffers act purely as
    /// caches. The transition into read-only mode flushes both buffers, so every backing file
    /// holds the authoritative values from then on. Leaving read-only mode requires no work.
    pub fn set_read_only(&mut self, read_only: bool) -> Result<(), Error> {
        if read_only && !self.read_only {
            if self.band.is_some() {
                self.reconcile_clash();
                if let Some(band) = &self.band {
                    band.flush(&self.files)?;
                }
            }
            self.columns.flush_all(&self.files)?;
        }
        self.read_only = read_only;
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_row_mode(&self) -> bool {
        self.band.is_some()
    }

    /// The value stored at (`row`, `col`). An out of range coordinate yields NaN, the missing
    /// value sentinel.
    pub fn value(&mut self, row: usize, col: usize) -> Result<f64, Error> {
        if row >= self.rows || col >= self.cols {
            return Ok(f64::NAN);
        }
        let value = *self.locate(row, col)?;
        if self.read_only {
            // No write can have happened through the location just consulted, so a recorded
            // clash cannot diverge.
            self.clash = None;
        }
        Ok(value)
    }

    /// Stores `value` at (`row`, `col`).
    pub fn set_value(&mut self, row: usize, col: usize, value: f64) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        if row >= self.rows || col >= self.cols {
            return Err(Error::CellOutOfRange {
                row,
                col,
                rows: self.rows,
                cols: self.cols,
            });
        }
        *self.locate(row, col)? = value;
        Ok(())
    }

    /// Cell access through a column major linear index: `index` addresses row
    /// `index % rows` of column `index / rows`. Out of range indices yield NaN.
    pub fn value_at(&mut self, index: usize) -> Result<f64, Error> {
        if self.rows == 0 {
            return Ok(f64::NAN);
        }
        self.value(index % self.rows, index / self.rows)
    }

    /// Stores `value` at the column major linear index `index`.
    pub fn set_value_at(&mut self, index: usize, value: f64) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        if self.rows == 0 {
            return Err(Error::CellOutOfRange {
                row: 0,
                col: 0,
                rows: self.rows,
                cols: self.cols,
            });
        }
        self.set_value(index % self.rows, index / self.rows, value)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Capacity of the row buffer in rows. While in column mode no band is allocated, this is
    /// the size it would have.
    pub fn buffer_rows(&self) -> usize {
        self.max_rows
    }

    /// Capacity of the column buffer in columns.
    pub fn buffer_cols(&self) -> usize {
        self.max_cols
    }

    pub fn prefix(&self) -> &str {
        self.files.prefix()
    }

    pub fn directory(&self) -> &Path {
        self.files.directory()
    }

    /// Path of the backing file of column `col`. The name is opaque and belongs to the engine,
    /// callers must not interpret it.
    pub fn file_name(&self, col: usize) -> Option<&Path> {
        self.files.path(col)
    }

    /// Changes the name prefix used for backing files created from here on.
    pub fn set_prefix(&mut self, prefix: &str) {
        self.files.set_prefix(prefix);
    }

    /// Moves every backing file into `directory`, renaming it with a fresh name on the way.
    pub fn set_directory(&mut self, directory: impl AsRef<Path>) -> Result<(), Error> {
        self.files.relocate(directory.as_ref())
    }

    /// Approximate number of bytes of memory held by the matrix, buffers and bookkeeping
    /// included.
    pub fn memory_in_use(&self) -> usize {
        size_of::<Self>()
            + self.columns.memory_in_use()
            + self.band.as_ref().map_or(0, RowBuffer::memory_in_use)
            + self.files.memory_in_use()
    }

    /// Number of bytes the backing files occupy on disk.
    pub fn file_space_in_use(&self) -> u64 {
        (self.rows * self.cols * size_of::<f64>()) as u64
    }

    /// The single entry point deciding which buffer a cell lives in. Triggers the flushes and
    /// loads required to make the cell resident and returns a reference to the canonical
    /// location. The reference must not be retained across operations.
    ///
    /// Callers have verified `row` and `col` to be in range.
    fn locate(&mut self, row: usize, col: usize) -> Result<&mut f64, Error> {
        debug_assert!(row < self.rows && col < self.cols);
        if self.band.is_some() {
            self.locate_row_mode(row, col)
        } else {
            self.locate_col_mode(row, col)
        }
    }

    fn locate_col_mode(&mut self, row: usize, col: usize) -> Result<&mut f64, Error> {
        if let Some(slot) = self.columns.position(col) {
            return Ok(&mut self.columns.values_mut(slot)[row]);
        }
        if !self.read_only {
            self.columns.flush_oldest(&self.files)?;
        }
        self.columns.rotate_in(col, &self.files)?;
        Ok(&mut self.columns.newest_values_mut()[row])
    }

    fn locate_row_mode(&mut self, row: usize, col: usize) -> Result<&mut f64, Error> {
        self.reconcile_clash();
        let band_hit = self.band.as_ref().is_some_and(|band| band.contains_row(row));
        if band_hit {
            if self.columns.position(col).is_some() {
                // The cell is in both buffers now. A write through the returned reference
                // updates the band only, so the column buffer copy may go stale.
                self.clash = Some(Clash { row, col });
            }
        } else if let Some(slot) = self.columns.position(col) {
            return Ok(&mut self.columns.values_mut(slot)[row]);
        } else {
            // The cell is in neither buffer. Persist both buffers, slide the band over the
            // requested row and bring the column in.
            if !self.read_only {
                if let Some(band) = &self.band {
                    band.flush(&self.files)?;
                }
                self.columns.flush_oldest(&self.files)?;
            }
            if let Some(band) = self.band.as_mut() {
                band.load(&self.files, row, self.rows, &self.columns)?;
            }
            self.columns.rotate_in(col, &self.files)?;
            self.clash = Some(Clash { row, col });
        }
        match self.band.as_mut() {
            Some(band) => Ok(band.value_mut(row, col)),
            None => unreachable!("row mode access without an active row buffer"),
        }
    }

    /// Copies the band value of a recorded clash into the column buffer slot still holding that
    /// column. The band is authoritative while the record exists. If the column has been
    /// evicted in the meantime the record is dropped without copying, the band still holds the
    /// value and a later band flush persists it.
    fn reconcile_clash(&mut self) {
        let Some(clash) = self.clash.take() else {
            return;
        };
        let Some(band) = self.band.as_ref() else {
            return;
        };
        if let Some(slot) = self.columns.position(clash.col) {
            self.columns.values_mut(slot)[clash.row] = band.value(clash.row, clash.col);
        }
    }

    /// Column traversal order which consumes resident columns before touching storage, so no
    /// resident column is evicted before it has been used.
    fn column_order(&self) -> Vec<usize> {
        if self.cols > self.max_cols {
            let mut order = self.columns.resident();
            let mut seen = vec![false; self.cols];
            for &col in &order {
                seen[col] = true;
            }
            order.extend((0..self.cols).filter(|&col| !seen[col]));
            order
        } else {
            (0..self.cols).collect()
        }
    }
}

impl Drop for DiskMatrix {
    fn drop(&mut self) {
        self.files.remove_all();
    }
}
