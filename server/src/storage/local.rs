//! Host-directory storage driver
//!
//! Maps the device namespace (`/logs/2021-01_hmd.csv`) onto a directory on
//! the host where the card is mounted.

use std::fs::{self, File, ReadDir};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};

use super::{FatTimestamp, StorageDevice, StorageDir, StorageError, StorageFile};

pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Resolve a device path under the mount root. Parent-directory
    /// components are rejected so a path can never leave the card.
    fn host_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::NotFound(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn mounted(&self) -> Result<(), StorageError> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(StorageError::Unavailable(self.root.display().to_string()))
        }
    }
}

fn map_open_error(path: &str, err: io::Error) -> StorageError {
    match err.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
        _ => StorageError::Io(err),
    }
}

impl StorageDevice for LocalStorage {
    fn open(&self, path: &str) -> Result<Box<dyn StorageFile>, StorageError> {
        self.mounted()?;
        let host = self.host_path(path)?;
        let file = File::open(&host).map_err(|e| map_open_error(path, e))?;
        let name = host
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Box::new(LocalFile::from_file(name, file)?))
    }

    fn open_dir(&self, path: &str) -> Result<Box<dyn StorageDir>, StorageError> {
        self.mounted()?;
        let host = self.host_path(path)?;
        let entries = fs::read_dir(&host).map_err(|e| map_open_error(path, e))?;
        Ok(Box::new(LocalDir { entries }))
    }

    fn exists(&self, path: &str) -> bool {
        self.host_path(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn is_mounted(&self) -> bool {
        self.root.is_dir()
    }
}

pub struct LocalFile {
    name: String,
    file: File,
    size: u64,
    modified: Option<SystemTime>,
}

impl LocalFile {
    fn from_file(name: String, file: File) -> Result<Self, StorageError> {
        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(StorageError::NotFound(name));
        }
        Ok(Self {
            name,
            file,
            size: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

impl StorageFile for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        Ok(self.file.read(buf)?)
    }

    fn packed_date_time(&self) -> Result<(u16, u16), StorageError> {
        let modified = self
            .modified
            .ok_or_else(|| StorageError::Metadata(self.name.clone()))?;
        let local: DateTime<Local> = modified.into();
        FatTimestamp::from_datetime(&local.naive_local())
            .map(|ts| ts.encode())
            .ok_or_else(|| StorageError::Metadata(self.name.clone()))
    }
}

struct LocalDir {
    entries: ReadDir,
}

impl StorageDir for LocalDir {
    fn open_next(&mut self) -> Option<Result<Box<dyn StorageFile>, StorageError>> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(StorageError::Io(e))),
            };

            match entry.file_type() {
                Ok(t) if t.is_dir() => {
                    tracing::debug!("Skipping sub-directory {}", entry.path().display());
                    continue;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(StorageError::Io(e))),
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let child = File::open(entry.path())
                .map_err(StorageError::from)
                .and_then(|file| LocalFile::from_file(name, file))
                .map(|f| Box::new(f) as Box<dyn StorageFile>);
            return Some(child);
        }
    }
}
