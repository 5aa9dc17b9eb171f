//! Storage device interface
//!
//! Every component that touches the card receives an explicit
//! `Arc<dyn StorageDevice>`; there is no process-wide device handle.
//! The device is assumed to have a single read cursor at a time, so callers
//! that run on a multi-threaded runtime must serialize access themselves.

pub mod fat;
pub mod local;
#[cfg(test)]
pub mod memory;

pub use fat::FatTimestamp;
pub use local::LocalStorage;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Unreadable metadata for {0}")]
    Metadata(String),
}

/// A mounted storage device (the logger's card).
pub trait StorageDevice: Send + Sync {
    /// Open a file for reading.
    fn open(&self, path: &str) -> Result<Box<dyn StorageFile>, StorageError>;

    /// Open a directory for child enumeration.
    fn open_dir(&self, path: &str) -> Result<Box<dyn StorageDir>, StorageError>;

    /// Native existence check.
    ///
    /// Not used for probing files before streaming them; see
    /// `archive::negotiate::probe`.
    fn exists(&self, path: &str) -> bool;

    /// Whether the card is present and initialised.
    fn is_mounted(&self) -> bool;
}

/// An open file handle. Dropping the handle releases it.
pub trait StorageFile: Send {
    fn name(&self) -> &str;

    fn size(&self) -> u64;

    /// One bounded read at the driver's cursor. Returns the number of bytes
    /// actually produced, which is `0` at end of file.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Last-write date and time in the FAT directory-entry bit layout.
    fn packed_date_time(&self) -> Result<(u16, u16), StorageError>;

    /// Release the handle. Consuming `self` makes a second release impossible.
    fn close(self: Box<Self>) {}
}

/// Cursor over the children of an open directory.
pub trait StorageDir: Send {
    /// Open the next child in native order. `None` once the directory is
    /// exhausted; an `Err` item means this child could not be opened and the
    /// cursor has already moved past it.
    fn open_next(&mut self) -> Option<Result<Box<dyn StorageFile>, StorageError>>;
}

/// Join a directory and a child name with exactly one `/` between them.
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{}/{}", dir, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/logs", "2021-01_hmd.csv"), "/logs/2021-01_hmd.csv");
        assert_eq!(join_path("/logs/", "a.csv"), "/logs/a.csv");
        assert_eq!(join_path("/", "index.html"), "/index.html");
        assert_eq!(join_path("", "a.csv"), "/a.csv");
    }
}
