use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    mem::size_of,
    path::{Path, PathBuf},
};

use log::debug;
use tempfile::Builder;

use crate::Error;

/// The backing store of a matrix: one uniquely named file per column, each holding the column's
/// values as contiguous doubles in host byte order, without any header.
///
/// No file handle is kept open between calls. Every transfer opens the file, seeks, moves the
/// bytes and closes it again, so the number of columns is not bounded by the process descriptor
/// limit.
pub struct FileSet {
    prefix: String,
    directory: PathBuf,
    paths: Vec<PathBuf>,
}

impl FileSet {
    pub fn new(prefix: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        FileSet {
            prefix: prefix.into(),
            directory: directory.into(),
            paths: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Changes the name prefix used for files created from here on. Existing files keep their
    /// names.
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the backing file of column `col`, or `None` if no such column exists.
    pub fn path(&self, col: usize) -> Option<&Path> {
        self.paths.get(col).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Creates the backing file for the next column and fills it with `rows` zeros. The file is
    /// named with the current prefix inside the current directory and is never truncated or
    /// extended afterwards.
    pub fn create_column(&mut self, rows: usize) -> Result<(), Error> {
        let file = Builder::new()
            .prefix(&self.prefix)
            .tempfile_in(&self.directory)
            .map_err(|source| storage_error("create", &self.directory, source))?;
        let (mut file, path) = file.keep().map_err(|persist| {
            storage_error("persist", persist.file.path().to_owned(), persist.error)
        })?;
        let zeros = vec![0f64; rows];
        file.write_all(bytemuck::cast_slice(&zeros))
            .map_err(|source| storage_error("write", &path, source))?;
        debug!("created backing file '{}' for {} rows", path.display(), rows);
        self.paths.push(path);
        Ok(())
    }

    /// Reads `dst.len()` values of column `col`, starting at row `first_row`. A file shorter
    /// than the requested range is reported as a storage failure.
    pub fn read_values(&self, col: usize, first_row: usize, dst: &mut [f64]) -> Result<(), Error> {
        let path = &self.paths[col];
        let mut file = File::open(path).map_err(|source| storage_error("open", path, source))?;
        file.seek(SeekFrom::Start((first_row * size_of::<f64>()) as u64))
            .map_err(|source| storage_error("seek", path, source))?;
        file.read_exact(bytemuck::cast_slice_mut(dst))
            .map_err(|source| storage_error("read", path, source))
    }

    /// Writes `src.len()` values into column `col`, starting at row `first_row`.
    pub fn write_values(&self, col: usize, first_row: usize, src: &[f64]) -> Result<(), Error> {
        let path = &self.paths[col];
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| storage_error("open", path, source))?;
        file.seek(SeekFrom::Start((first_row * size_of::<f64>()) as u64))
            .map_err(|source| storage_error("seek", path, source))?;
        file.write_all(bytemuck::cast_slice(src))
            .map_err(|source| storage_error("write", path, source))
    }

    /// Moves every backing file into `directory`, generating a fresh name with the current
    /// prefix for each. Callers must not have interpreted the old names.
    pub fn relocate(&mut self, directory: &Path) -> Result<(), Error> {
        for path in &mut self.paths {
            let placeholder = Builder::new()
                .prefix(&self.prefix)
                .tempfile_in(directory)
                .map_err(|source| storage_error("create", directory, source))?;
            let (file, new_path) = placeholder.keep().map_err(|persist| {
                storage_error("persist", persist.file.path().to_owned(), persist.error)
            })?;
            // The placeholder only reserved the name. Release it so the rename works on every
            // platform.
            drop(file);
            fs::remove_file(&new_path)
                .map_err(|source| storage_error("remove", &new_path, source))?;
            fs::rename(&*path, &new_path)
                .map_err(|source| storage_error("rename", &*path, source))?;
            *path = new_path;
        }
        debug!(
            "relocated {} backing files to '{}'",
            self.paths.len(),
            directory.display()
        );
        self.directory = directory.to_owned();
        Ok(())
    }

    /// Best effort removal of every backing file. Failures are ignored, destruction must not
    /// fail.
    pub fn remove_all(&mut self) {
        for path in self.paths.drain(..) {
            let _ = fs::remove_file(path);
        }
    }

    /// Bytes spent on path and name bookkeeping. The file contents themselves live on disk and
    /// are not part of this figure.
    pub fn memory_in_use(&self) -> usize {
        self.prefix.capacity()
            + self.directory.capacity()
            + self.paths.capacity() * size_of::<PathBuf>()
            + self.paths.iter().map(|p| p.capacity()).sum::<usize>()
    }
}

fn storage_error(
    operation: &'static str,
    path: impl Into<PathBuf>,
    source: io::Error,
) -> Error {
    Error::Storage {
        operation,
        path: path.into(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::FileSet;
    use crate::Error;

    #[test]
    fn new_column_is_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new("col", dir.path());
        files.create_column(4).unwrap();

        assert_eq!(
            fs::metadata(files.path(0).unwrap()).unwrap().len(),
            4 * 8
        );
        let mut values = [1.0; 4];
        files.read_values(0, 0, &mut values).unwrap();
        assert_eq!(values, [0.0; 4]);
    }

    #[test]
    fn write_then_read_row_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new("col", dir.path());
        files.create_column(5).unwrap();
        files.write_values(0, 0, &[1., 2., 3., 4., 5.]).unwrap();

        let mut band = [0.0; 2];
        files.read_values(0, 2, &mut band).unwrap();
        assert_eq!(band, [3., 4.]);
    }

    #[test]
    fn short_read_is_a_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new("col", dir.path());
        files.create_column(2).unwrap();

        let mut too_many = [0.0; 3];
        let result = files.read_values(0, 0, &mut too_many);
        assert!(matches!(result, Err(Error::Storage { operation: "read", .. })));
    }

    #[test]
    fn relocate_moves_files_and_preserves_contents() {
        let old_dir = tempfile::tempdir().unwrap();
        let new_dir = tempfile::tempdir().unwrap();
        let mut files = FileSet::new("col", old_dir.path());
        files.create_column(3).unwrap();
        files.write_values(0, 0, &[7., 8., 9.]).unwrap();

        files.relocate(new_dir.path()).unwrap();

        assert!(files.path(0).unwrap().starts_with(new_dir.path()));
        let mut values = [0.0; 3];
        files.read_values(0, 0, &mut values).unwrap();
        assert_eq!(values, [7., 8., 9.]);
    }
}
