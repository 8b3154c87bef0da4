use std::{io, path::PathBuf};

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
/// Error type used to indicate that an operation on a [`crate::DiskMatrix`] failed.
pub enum Error {
    /// A backing file could not be opened, created, renamed, or did not transfer as many values
    /// as the matrix dimensions require. The buffers themselves are intact, but the operation
    /// which provoked the failure has not completed.
    #[error("Storage failure during {operation} of '{path}': {source}")]
    Storage {
        /// Low level file operation which failed.
        operation: &'static str,
        /// Backing file (or directory) the operation touched.
        path: PathBuf,
        /// Underlying I/O error. Short transfers surface here as an unexpected end of file.
        source: io::Error,
    },
    /// A write path has been invoked while the matrix is in read-only mode. Nothing has been
    /// modified.
    #[error("The matrix is in read-only mode. Write access is disabled.")]
    ReadOnly,
    /// A cell coordinate lies outside the matrix dimensions.
    #[error("Cell ({row}, {col}) is out of range for a {rows} x {cols} matrix.")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    /// A row index passed to a bulk operation lies outside the matrix.
    #[error("Row index {row} is out of range for a matrix with {rows} rows.")]
    RowOutOfRange { row: usize, rows: usize },
    /// A column index passed to a bulk operation lies outside the matrix.
    #[error("Column index {col} is out of range for a matrix with {cols} columns.")]
    ColumnOutOfRange { col: usize, cols: usize },
    /// The flat value buffer passed to a bulk write does not match the selection it is supposed
    /// to fill.
    #[error("Expected a buffer of {expected} values, got {actual}.")]
    BufferSizeMismatch { expected: usize, actual: usize },
    /// Buffer capacities of zero rows or zero columns are rejected, both at construction and on
    /// resize.
    #[error("Buffer capacities must be at least one row and one column.")]
    InvalidBufferCapacity,
}
