//! In-memory storage device for tests
//!
//! Counts handle opens and releases, and can inject read failures and
//! unreadable directory metadata.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use super::{FatTimestamp, StorageDevice, StorageDir, StorageError, StorageFile};

#[derive(Clone)]
struct MemoryEntry {
    path: String,
    data: Arc<Vec<u8>>,
    packed: Option<(u16, u16)>,
    fail_read_after: Option<usize>,
    report_size: Option<u64>,
}

#[derive(Default)]
pub struct Counters {
    pub opens: AtomicUsize,
    pub releases: AtomicUsize,
    pub exists_calls: AtomicUsize,
}

impl Counters {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.opens() - self.releases()
    }
}

pub struct MemoryStorage {
    entries: Vec<MemoryEntry>,
    dirs: Vec<String>,
    mounted: AtomicBool,
    counters: Arc<Counters>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(pos) => &path[..pos],
        None => "",
    }
}

fn default_stamp() -> (u16, u16) {
    FatTimestamp {
        year: 2021,
        month: 1,
        day: 1,
        hour: 10,
        minute: 30,
        second: 30,
    }
    .encode()
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            dirs: vec!["/".to_string()],
            mounted: AtomicBool::new(true),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::SeqCst);
    }

    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        self.dirs.push(path.trim_end_matches('/').to_string());
        self
    }

    pub fn add_file(&mut self, path: &str, data: impl Into<Vec<u8>>) -> &mut Self {
        self.add_file_stamped(path, data, default_stamp())
    }

    pub fn add_file_stamped(
        &mut self,
        path: &str,
        data: impl Into<Vec<u8>>,
        packed: (u16, u16),
    ) -> &mut Self {
        self.entries.push(MemoryEntry {
            path: path.to_string(),
            data: Arc::new(data.into()),
            packed: Some(packed),
            fail_read_after: None,
            report_size: None,
        });
        self
    }

    /// A file whose directory entry cannot be read.
    pub fn add_unreadable_entry(&mut self, path: &str, data: impl Into<Vec<u8>>) -> &mut Self {
        self.add_file(path, data);
        if let Some(entry) = self.entries.last_mut() {
            entry.packed = None;
        }
        self
    }

    /// A file whose reads fail once `after` bytes have been produced.
    pub fn add_failing_file(&mut self, path: &str, data: impl Into<Vec<u8>>, after: usize) -> &mut Self {
        self.add_file(path, data);
        if let Some(entry) = self.entries.last_mut() {
            entry.fail_read_after = Some(after);
        }
        self
    }

    /// A file whose reported size is larger than its content, as if it was
    /// cut short after the directory entry was written.
    pub fn add_short_file(&mut self, path: &str, data: impl Into<Vec<u8>>, size: u64) -> &mut Self {
        self.add_file(path, data);
        if let Some(entry) = self.entries.last_mut() {
            entry.report_size = Some(size);
        }
        self
    }

    fn handle(&self, entry: &MemoryEntry) -> Box<dyn StorageFile> {
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryFile {
            entry: entry.clone(),
            cursor: 0,
            counters: self.counters.clone(),
        })
    }

    fn check_mounted(&self) -> Result<(), StorageError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(StorageError::Unavailable("card not present".into()))
        }
    }
}

impl StorageDevice for MemoryStorage {
    fn open(&self, path: &str) -> Result<Box<dyn StorageFile>, StorageError> {
        self.check_mounted()?;
        self.entries
            .iter()
            .find(|e| e.path == path)
            .map(|e| self.handle(e))
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn open_dir(&self, path: &str) -> Result<Box<dyn StorageDir>, StorageError> {
        self.check_mounted()?;
        let path = if path == "/" { path } else { path.trim_end_matches('/') };
        if !self.dirs.iter().any(|d| d == path) {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let pending = self
            .entries
            .iter()
            .filter(|e| parent_of(&e.path) == path)
            .cloned()
            .collect::<Vec<_>>();
        Ok(Box::new(MemoryDir {
            pending: pending.into_iter(),
            counters: self.counters.clone(),
        }))
    }

    fn exists(&self, path: &str) -> bool {
        self.counters.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.dirs.iter().any(|d| d == path) || self.entries.iter().any(|e| e.path == path)
    }

    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }
}

struct MemoryFile {
    entry: MemoryEntry,
    cursor: usize,
    counters: Arc<Counters>,
}

impl StorageFile for MemoryFile {
    fn name(&self) -> &str {
        self.entry.path.rsplit('/').next().unwrap_or("")
    }

    fn size(&self) -> u64 {
        self.entry
            .report_size
            .unwrap_or(self.entry.data.len() as u64)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        if let Some(after) = self.entry.fail_read_after {
            if self.cursor >= after {
                return Err(StorageError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "injected read failure",
                )));
            }
        }
        let remaining = &self.entry.data[self.cursor..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.cursor += n;
        Ok(n)
    }

    fn packed_date_time(&self) -> Result<(u16, u16), StorageError> {
        self.entry
            .packed
            .ok_or_else(|| StorageError::Metadata(self.entry.path.clone()))
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryDir {
    pending: std::vec::IntoIter<MemoryEntry>,
    counters: Arc<Counters>,
}

impl StorageDir for MemoryDir {
    fn open_next(&mut self) -> Option<Result<Box<dyn StorageFile>, StorageError>> {
        let entry = self.pending.next()?;
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Some(Ok(Box::new(MemoryFile {
            entry,
            cursor: 0,
            counters: self.counters.clone(),
        })))
    }
}
