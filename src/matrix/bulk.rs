//! Bulk access: whole columns, whole rows, sub-rectangles, copies between matrices and
//! element-wise transformations. All of it traverses the matrix in a buffer-aware order where
//! one exists, and falls back to the generic cell lookup where it does not.

use crate::{DiskMatrix, Error};

impl DiskMatrix {
    /// Reads the requested columns into one flat buffer in column major order: the value at
    /// output index `j * rows + i` is the cell (`i`, `cols[j]`).
    ///
    /// In column mode resident columns are copied as one block and missing columns are loaded
    /// whole. In row mode every cell goes through the generic lookup, correctness over speed,
    /// since row mode is not laid out for per-column streaming.
    pub fn read_columns(&mut self, cols: &[usize]) -> Result<Vec<f64>, Error> {
        self.check_columns(cols)?;
        let rows = self.rows();
        let mut out = vec![0.0; cols.len() * rows];
        if self.band.is_some() {
            for (j, &col) in cols.iter().enumerate() {
                for row in 0..rows {
                    out[j * rows + row] = *self.locate(row, col)?;
                    // Nothing is written through the looked up location.
                    self.clash = None;
                }
            }
        } else {
            for (j, &col) in cols.iter().enumerate() {
                let chunk = &mut out[j * rows..(j + 1) * rows];
                if let Some(slot) = self.columns.position(col) {
                    chunk.copy_from_slice(self.columns.values(slot));
                } else {
                    if !self.read_only {
                        self.columns.flush_oldest(&self.files)?;
                    }
                    self.columns.rotate_in(col, &self.files)?;
                    chunk.copy_from_slice(self.columns.newest_values());
                }
            }
        }
        Ok(out)
    }

    /// Writes the requested columns from one flat buffer laid out as in
    /// [`Self::read_columns`]. A column which is about to be overwritten whole is claimed in
    /// the buffer without reading its file first.
    pub fn write_columns(&mut self, cols: &[usize], values: &[f64]) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.check_columns(cols)?;
        let rows = self.rows();
        let expected = cols.len() * rows;
        if values.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        if self.band.is_some() {
            for (j, &col) in cols.iter().enumerate() {
                for row in 0..rows {
                    *self.locate(row, col)? = values[j * rows + row];
                }
            }
        } else {
            for (j, &col) in cols.iter().enumerate() {
                let chunk = &values[j * rows..(j + 1) * rows];
                if let Some(slot) = self.columns.position(col) {
                    self.columns.values_mut(slot).copy_from_slice(chunk);
                } else {
                    self.columns.flush_oldest(&self.files)?;
                    self.columns.rotate_in_nofill(col);
                    self.columns.newest_values_mut().copy_from_slice(chunk);
                }
            }
        }
        Ok(())
    }

    /// Reads the requested rows across all columns into one flat buffer: the value at output
    /// index `j * rows.len() + i` is the cell (`rows[i]`, `j`).
    ///
    /// In column mode the columns currently resident are consumed first, so none of them is
    /// evicted before it has been used. In row mode rows iterate outer and columns inner, which
    /// follows the band.
    pub fn read_rows(&mut self, rows: &[usize]) -> Result<Vec<f64>, Error> {
        self.check_rows(rows)?;
        let nrows = rows.len();
        let mut out = vec![0.0; nrows * self.cols()];
        if self.band.is_none() {
            for col in self.column_order() {
                for (i, &row) in rows.iter().enumerate() {
                    out[col * nrows + i] = *self.locate(row, col)?;
                }
            }
        } else {
            for (i, &row) in rows.iter().enumerate() {
                for col in 0..self.cols() {
                    out[col * nrows + i] = *self.locate(row, col)?;
                    self.clash = None;
                }
            }
        }
        Ok(out)
    }

    /// Writes the requested rows across all columns from one flat buffer laid out as in
    /// [`Self::read_rows`].
    pub fn write_rows(&mut self, rows: &[usize], values: &[f64]) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.check_rows(rows)?;
        let nrows = rows.len();
        let expected = nrows * self.cols();
        if values.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        if self.band.is_none() {
            for col in self.column_order() {
                for (i, &row) in rows.iter().enumerate() {
                    *self.locate(row, col)? = values[col * nrows + i];
                }
            }
        } else {
            for (i, &row) in rows.iter().enumerate() {
                for col in 0..self.cols() {
                    *self.locate(row, col)? = values[col * nrows + i];
                }
            }
        }
        Ok(())
    }

    /// Reads the sub-rectangle selected by `rows` and `cols`: the value at output index
    /// `j * rows.len() + i` is the cell (`rows[i]`, `cols[j]`). Plain cell by cell lookup.
    pub fn read_submatrix(&mut self, rows: &[usize], cols: &[usize]) -> Result<Vec<f64>, Error> {
        self.check_rows(rows)?;
        self.check_columns(cols)?;
        let nrows = rows.len();
        let mut out = vec![0.0; nrows * cols.len()];
        for (j, &col) in cols.iter().enumerate() {
            for (i, &row) in rows.iter().enumerate() {
                out[j * nrows + i] = *self.locate(row, col)?;
                self.clash = None;
            }
        }
        Ok(out)
    }

    /// Writes the sub-rectangle selected by `rows` and `cols` from one flat buffer laid out as
    /// in [`Self::read_submatrix`].
    pub fn write_submatrix(
        &mut self,
        rows: &[usize],
        cols: &[usize],
        values: &[f64],
    ) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        self.check_rows(rows)?;
        self.check_columns(cols)?;
        let nrows = rows.len();
        let expected = nrows * cols.len();
        if values.len() != expected {
            return Err(Error::BufferSizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        for (j, &col) in cols.iter().enumerate() {
            for (i, &row) in rows.iter().enumerate() {
                *self.locate(row, col)? = values[j * nrows + i];
            }
        }
        Ok(())
    }

    /// Copies every cell of `source` into `self`.
    ///
    /// Both matrices must have the same shape. A mismatch is a programming error and panics.
    pub fn copy_values_from(&mut self, source: &mut DiskMatrix) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        if self.rows() != source.rows() || self.cols() != source.cols() {
            panic!(
                "Cannot copy values between a {} x {} and a {} x {} matrix.",
                source.rows(),
                source.cols(),
                self.rows(),
                self.cols()
            );
        }
        for col in 0..self.cols() {
            for row in 0..self.rows() {
                let value = *source.locate(row, col)?;
                source.clash = None;
                *self.locate(row, col)? = value;
            }
        }
        Ok(())
    }

    /// Applies `f` to every cell in place, resident columns first so none of them is evicted
    /// before it has been used.
    pub fn apply(&mut self, mut f: impl FnMut(f64) -> f64) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }
        for col in self.column_order() {
            for row in 0..self.rows() {
                let cell = self.locate(row, col)?;
                *cell = f(*cell);
            }
        }
        Ok(())
    }

    fn check_rows(&self, rows: &[usize]) -> Result<(), Error> {
        for &row in rows {
            if row >= self.rows() {
                return Err(Error::RowOutOfRange {
                    row,
                    rows: self.rows(),
                });
            }
        }
        Ok(())
    }

    fn check_columns(&self, cols: &[usize]) -> Result<(), Error> {
        for &col in cols {
            if col >= self.cols() {
                return Err(Error::ColumnOutOfRange {
                    col,
                    cols: self.cols(),
                });
            }
        }
        Ok(())
    }
}
