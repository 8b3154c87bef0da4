#![allow(clippy::needless_doctest_main)]
/*!
# Introduction to `disk-matrix` (documentation only)

## About out-of-core matrices

A [`crate::DiskMatrix`] holds a dense matrix of `f64` values whose backing storage is a set of
temporary files, one per column, each holding the column's values as contiguous doubles in host
byte order. Two bounded buffers keep a working set in memory: a column buffer holding up to
`max_cols` whole columns, and an optional row buffer holding a band of up to `max_rows`
consecutive rows across every column. Only the buffers bound the memory footprint; the matrix
itself may be far larger than RAM.

This guide walks through the intended usage patterns. The type level documentation of
[`crate::DiskMatrix`] describes the individual operations.

## Quickstart

```
use disk_matrix::DiskMatrix;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;

    // Keep at most three columns and a band of 256 rows in memory.
    let mut matrix = DiskMatrix::new("quickstart", dir.path(), 256, 3)?;

    // The row count is fixed once, columns are appended as needed. Every new column starts out
    // as zeros in its own backing file.
    matrix.set_rows(1_000);
    for _ in 0..8 {
        matrix.add_column()?;
    }

    // Stream a column in as one block.
    let column: Vec<f64> = (0..1_000).map(|i| i as f64).collect();
    matrix.write_columns(&[4], &column)?;

    // Individual cells work, too. Access decides internally which buffer serves the cell and
    // when a column has to travel to or from its file.
    matrix.set_value(17, 2, 0.5)?;
    assert_eq!(0.5, matrix.value(17, 2)?);

    // Reductions traverse the matrix without thrashing the buffers.
    assert_eq!(matrix.col_sums(false)?[4], 499_500.0);
    Ok(())
}
```

## Choosing buffer sizes

The column buffer pays off when access streams down columns: the first touch of a column reads
its whole file once, every further cell of that column is served from memory. `max_cols` should
cover the number of columns the workload alternates between. The row buffer capacity `max_rows`
only matters once row mode is active; it determines how many consecutive rows are available
without going back to disk.

Both capacities can be changed later with [`crate::DiskMatrix::resize_buffer`], which keeps the
observable contents of the matrix unchanged. Memory usage can be inspected with
[`crate::DiskMatrix::memory_in_use`], the disk footprint with
[`crate::DiskMatrix::file_space_in_use`].

## Column mode and row mode

A fresh matrix is in column mode: only the column buffer is active and traversals along a
column are cheap. Iterating along a *row* in column mode is the worst case, every step may
evict and load whole columns. Switch to row mode first:

```
use disk_matrix::DiskMatrix;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut matrix = DiskMatrix::new("modes", dir.path(), 64, 2)?;
    matrix.set_rows(500);
    for _ in 0..10 {
        matrix.add_column()?;
    }

    // Row mode keeps a band of consecutive rows across all ten columns in memory.
    matrix.set_row_mode()?;
    for col in 0..matrix.cols() {
        matrix.set_value(123, col, col as f64)?;
    }

    // Back to column mode: the band is written out and freed.
    matrix.set_col_mode()?;
    assert_eq!(matrix.value(123, 9)?, 9.0);
    Ok(())
}
```

Every operation works in either mode. The mode only changes which access pattern avoids disk
traffic, never the results. [`crate::DiskMatrix::row_medians`] is the one operation which is
only reasonable in row mode, since it revisits every row with a scratch buffer.

## Missing values

Missing values are IEEE NaN. All reductions take a `skip_missing` flag: with `false` any
missing input makes the affected result missing, with `true` missing inputs are dropped. If
*everything* is dropped, means, variances and medians are missing; sums are zero; minima and
maxima report their reduction identity (`+∞` respectively `-∞`) and emit a warning through the
[`log`] facade.

```
use disk_matrix::DiskMatrix;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let mut matrix = DiskMatrix::new("missing", dir.path(), 16, 2)?;
    matrix.set_rows(3);
    matrix.add_column()?;
    matrix.write_columns(&[0], &[1.0, f64::NAN, 3.0])?;

    assert!(matrix.mean(false)?.is_nan());
    assert_eq!(matrix.mean(true)?, 2.0);

    // Out of range reads also yield the missing sentinel instead of failing.
    assert!(matrix.value(99, 99)?.is_nan());
    Ok(())
}
```

## Read-only mode

Once a matrix is fully computed, [`crate::DiskMatrix::set_read_only`] freezes it. The
transition writes both buffers out, so afterwards every backing file holds the authoritative
values and the buffers act purely as caches; no further writeback ever happens. Write paths
fail with [`crate::Error::ReadOnly`] while the flag is set, and the flag can be cleared again
at any time.

Read-only mode is also the point at which the backing files may be inspected or copied by
other tooling: their contents are guaranteed to match the matrix until the flag is cleared and
the next write happens. Their *names* remain opaque; use [`crate::DiskMatrix::file_name`] to
obtain them.

## Error handling

All fallible operations return a [`Result`] with [`crate::Error`]. Storage failures carry the
offending path and the underlying [`std::io::Error`]; a backing file shorter than the matrix
dimensions require surfaces as such a failure rather than silently yielding garbage. The
engine never retries and never tears its buffers on a failed operation.

The one panic in the crate is [`crate::DiskMatrix::copy_values_from`] on a shape mismatch,
which is a programming error rather than a runtime fault.

## Lifetime of the backing files

The matrix owns its files. They are created inside the configured directory when a column is
appended, renamed when [`crate::DiskMatrix::set_directory`] moves the matrix elsewhere, and
removed when the matrix is dropped. Nothing of the matrix survives its drop; persistence
across processes is not a goal of this crate.
*/
