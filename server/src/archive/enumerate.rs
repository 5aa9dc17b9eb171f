//! Archive directory enumeration
//!
//! Walks the directory's native child cursor and decodes each entry's packed
//! last-write timestamp. Entries are yielded in the order the driver returns
//! them; nothing is sorted.

use std::sync::Arc;

use serde::Serialize;

use crate::storage::{FatTimestamp, StorageDevice, StorageDir, StorageFile};

use super::ArchiveError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub name: String,
    pub size_bytes: u64,
    pub timestamp: FatTimestamp,
}

impl LogEntry {
    fn read(child: &dyn StorageFile) -> Result<Self, ArchiveError> {
        let name = child.name().to_string();
        let (date, time) = child.packed_date_time()?;
        let timestamp = FatTimestamp::decode(date, time)
            .ok_or_else(|| ArchiveError::MetadataDecodeFailure(name.clone()))?;
        Ok(Self {
            size_bytes: child.size(),
            name,
            timestamp,
        })
    }

    pub fn size_kib(&self) -> u64 {
        self.size_bytes / 1024
    }
}

/// Wire shape of one entry in the JSON listing.
#[derive(Serialize)]
pub struct LogEntryJson {
    pub name: String,
    pub date: String,
    pub size: u64,
}

impl From<&LogEntry> for LogEntryJson {
    fn from(entry: &LogEntry) -> Self {
        Self {
            name: entry.name.clone(),
            date: entry.timestamp.to_string(),
            size: entry.size_bytes,
        }
    }
}

pub struct ArchiveEnumerator {
    storage: Arc<dyn StorageDevice>,
}

impl ArchiveEnumerator {
    pub fn new(storage: Arc<dyn StorageDevice>) -> Self {
        Self { storage }
    }

    /// Start a fresh enumeration of `directory`.
    ///
    /// Fails with [`ArchiveError::StorageUnavailable`] when the card is
    /// missing or the directory cannot be opened.
    pub fn list(&self, directory: &str) -> Result<LogEntries, ArchiveError> {
        let dir = self.storage.open_dir(directory).map_err(|e| {
            tracing::warn!("Cannot open {}: {}", directory, e);
            ArchiveError::StorageUnavailable(format!("{}: {}", directory, e))
        })?;
        Ok(LogEntries {
            directory: directory.to_string(),
            dir,
        })
    }
}

/// Lazy sequence of decoded entries. Undecodable children are skipped.
pub struct LogEntries {
    directory: String,
    dir: Box<dyn StorageDir>,
}

impl Iterator for LogEntries {
    type Item = LogEntry;

    fn next(&mut self) -> Option<LogEntry> {
        loop {
            let child = match self.dir.open_next()? {
                Ok(child) => child,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", self.directory, e);
                    continue;
                }
            };

            let entry = LogEntry::read(child.as_ref());
            child.close();

            match entry {
                Ok(entry) => return Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping entry in {}: {}", self.directory, e);
                }
            }
        }
    }
}
