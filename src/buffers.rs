//! The two in-memory caches of a matrix. The column buffer holds a bounded number of whole
//! columns in eviction order. The row buffer, when active, holds a band of consecutive rows
//! across every column. The matrix itself arbitrates which of the two is authoritative for a
//! given cell.

mod column_buffer;
mod row_buffer;

pub use self::{column_buffer::ColumnBuffer, row_buffer::RowBuffer};
