use std::mem::size_of;

use crate::{Error, buffers::ColumnBuffer, storage::FileSet};

/// A horizontal band of consecutive rows held in memory across every column of the matrix. One
/// contiguous allocation per column. While the band is active it is the authoritative copy for
/// the cells it covers, modulo the single clash record kept by the matrix.
pub struct RowBuffer {
    /// One band per column, each `band_rows` long.
    bands: Vec<Vec<f64>>,
    /// Matrix row stored at band offset zero. Always within `[0, rows - band_rows]`.
    first_row: usize,
    band_rows: usize,
}

impl RowBuffer {
    /// A zeroed band over `cols` columns. The caller loads it before first use.
    pub fn new(cols: usize, band_rows: usize) -> Self {
        RowBuffer {
            bands: vec![vec![0.0; band_rows]; cols],
            first_row: 0,
            band_rows,
        }
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row && row < self.first_row + self.band_rows
    }

    pub fn value(&self, row: usize, col: usize) -> f64 {
        self.bands[col][row - self.first_row]
    }

    pub fn value_mut(&mut self, row: usize, col: usize) -> &mut f64 {
        &mut self.bands[col][row - self.first_row]
    }

    /// Slides the band so it contains `target_row`, clamped against the bottom of the matrix,
    /// and reloads it. Files are read first, then the bands of resident columns are overwritten
    /// from the column buffer, since a buffered column is authoritative over its file.
    pub fn load(
        &mut self,
        files: &FileSet,
        target_row: usize,
        total_rows: usize,
        columns: &ColumnBuffer,
    ) -> Result<(), Error> {
        self.first_row = target_row.min(total_rows.saturating_sub(self.band_rows));
        for (col, band) in self.bands.iter_mut().enumerate() {
            files.read_values(col, self.first_row, band)?;
        }
        for (col, values) in columns.iter() {
            if col < self.bands.len() {
                self.bands[col]
                    .copy_from_slice(&values[self.first_row..self.first_row + self.band_rows]);
            }
        }
        Ok(())
    }

    /// Writes the band of every column back to the files, at the current band position.
    pub fn flush(&self, files: &FileSet) -> Result<(), Error> {
        for (col, band) in self.bands.iter().enumerate() {
            files.write_values(col, self.first_row, band)?;
        }
        Ok(())
    }

    /// Appends a zeroed band for a freshly added column.
    pub fn push_column(&mut self) {
        self.bands.push(vec![0.0; self.band_rows]);
    }

    /// Shrinks every band to `new_rows`, keeping the top of the band. The caller must have
    /// flushed beforehand, the cut rows are gone afterwards.
    pub fn shrink(&mut self, new_rows: usize) {
        for band in &mut self.bands {
            band.truncate(new_rows);
        }
        self.band_rows = new_rows;
    }

    /// Grows the band storage to `new_rows`. The contents are stale afterwards, the caller
    /// reloads the band.
    pub fn grow(&mut self, new_rows: usize) {
        for band in &mut self.bands {
            band.resize(new_rows, 0.0);
        }
        self.band_rows = new_rows;
    }

    pub fn memory_in_use(&self) -> usize {
        self.bands.capacity() * size_of::<Vec<f64>>()
            + self
                .bands
                .iter()
                .map(|band| band.capacity() * size_of::<f64>())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::RowBuffer;
    use crate::{buffers::ColumnBuffer, storage::FileSet};

    #[test]
    fn sliding_clamps_against_the_bottom_of_the_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new("col", dir.path());
        files.create_column(5).unwrap();
        files.write_values(0, 0, &[0., 1., 2., 3., 4.]).unwrap();

        let mut band = RowBuffer::new(1, 2);
        band.load(&files, 4, 5, &ColumnBuffer::new()).unwrap();

        assert_eq!(band.first_row(), 3);
        assert_eq!(band.value(3, 0), 3.);
        assert_eq!(band.value(4, 0), 4.);
    }

    #[test]
    fn resident_columns_overwrite_the_band_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new("col", dir.path());
        files.create_column(3).unwrap();

        // The buffered copy diverges from the (zeroed) file.
        let mut columns = ColumnBuffer::new();
        columns.push(0, vec![7., 8., 9.]);

        let mut band = RowBuffer::new(1, 2);
        band.load(&files, 1, 3, &columns).unwrap();

        assert_eq!(band.value(1, 0), 8.);
        assert_eq!(band.value(2, 0), 9.);
    }
}
