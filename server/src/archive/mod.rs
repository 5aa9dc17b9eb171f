//! Log archive core
//!
//! Serves archived log files from the storage card: content negotiation,
//! pull-based file streaming, directory enumeration with packed-timestamp
//! decoding, and the index views built on top of them.

pub mod enumerate;
pub mod index;
pub mod negotiate;
pub mod stream;

pub use enumerate::{ArchiveEnumerator, LogEntries};
pub use index::ArchiveIndex;
pub use negotiate::{ContentDescriptor, ContentNegotiator, Disposition};
pub use stream::{FileStreamResponse, StreamState};

use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Stream truncated after {delivered} of {declared} bytes")]
    Truncated { delivered: u64, declared: u64 },
    #[error("Unreadable directory entry: {0}")]
    MetadataDecodeFailure(String),
    #[error("Invalid log name: {0}")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for ArchiveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(path) => ArchiveError::NotFound(path),
            StorageError::Unavailable(msg) => ArchiveError::StorageUnavailable(msg),
            StorageError::Metadata(name) => ArchiveError::MetadataDecodeFailure(name),
            StorageError::Io(e) => ArchiveError::Io(e),
        }
    }
}
