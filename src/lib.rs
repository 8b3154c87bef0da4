//! # About
//!
//! `disk-matrix` stores a dense two dimensional array of IEEE-754 double precision values on
//! disk, one backing file per column, while two bounded in-memory buffers serve reads and
//! writes with locality. It is aimed at tall matrices (many rows, moderate columns) which are
//! streamed either down a column or across a row and whose total size may exceed RAM. See the
//! documentation of [`DiskMatrix`] for more information and code examples.

mod buffers;
mod error;
mod matrix;
mod storage;

pub mod guide;

pub use self::{error::Error, matrix::DiskMatrix};
