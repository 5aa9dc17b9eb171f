//! Pull-based file streaming
//!
//! A [`FileStreamResponse`] owns one open storage handle and hands out its
//! bytes in bounded chunks as the transport asks for them. The length
//! promised to the client is captured once at open time and never exceeded.
//!
//! ```text
//! Opening --open--> Streaming --drained--> Draining --close--> Closed
//!     \                 |                      |
//!      +----------------+-------- I/O error ---+--> Failed (handle released)
//! ```

use crate::storage::{StorageDevice, StorageError, StorageFile};

use super::{ArchiveError, ContentDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Opening,
    Streaming,
    Draining,
    Closed,
    Failed,
}

pub struct FileStreamResponse {
    handle: Option<Box<dyn StorageFile>>,
    descriptor: ContentDescriptor,
    declared_length: u64,
    bytes_delivered: u64,
    state: StreamState,
}

impl FileStreamResponse {
    /// Open `descriptor.resolved_path` on the device.
    pub fn open(
        storage: &dyn StorageDevice,
        descriptor: ContentDescriptor,
    ) -> Result<Self, ArchiveError> {
        let handle = storage
            .open(&descriptor.resolved_path)
            .map_err(|e| match e {
                StorageError::NotFound(_) => ArchiveError::NotFound(descriptor.resolved_path.clone()),
                other => other.into(),
            })?;
        Ok(Self::from_handle(handle, descriptor))
    }

    /// Wrap a handle the caller already opened.
    pub fn from_handle(handle: Box<dyn StorageFile>, descriptor: ContentDescriptor) -> Self {
        let declared_length = handle.size();
        let mut session = Self {
            handle: Some(handle),
            descriptor,
            declared_length,
            bytes_delivered: 0,
            state: StreamState::Opening,
        };

        tracing::debug!(
            "Streaming {} ({} bytes, {})",
            session.descriptor.resolved_path,
            declared_length,
            session.descriptor.mime_type
        );
        session.state = StreamState::Streaming;
        session.check_drained();
        session
    }

    pub fn descriptor(&self) -> &ContentDescriptor {
        &self.descriptor
    }

    pub fn declared_length(&self) -> u64 {
        self.declared_length
    }

    pub fn bytes_delivered(&self) -> u64 {
        self.bytes_delivered
    }

    pub fn remaining(&self) -> u64 {
        self.declared_length - self.bytes_delivered
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Perform one bounded read into `buf` and return how many bytes the
    /// driver actually produced. Returns `0` once the declared length has
    /// been delivered or the session is no longer streaming.
    ///
    /// A read that produces nothing before the declared length is reached
    /// fails the session with [`ArchiveError::Truncated`]; any driver error
    /// also fails it. Either way the handle is released immediately.
    pub fn fill_buffer(&mut self, buf: &mut [u8]) -> Result<usize, ArchiveError> {
        if self.state != StreamState::Streaming {
            return Ok(0);
        }

        let want = usize::try_from(self.remaining())
            .unwrap_or(usize::MAX)
            .min(buf.len());
        if want == 0 {
            return Ok(0);
        }

        let handle = match self.handle.as_mut() {
            Some(handle) => handle,
            None => return Ok(0),
        };

        match handle.read(&mut buf[..want]) {
            Ok(0) => {
                tracing::warn!(
                    "{} ended after {} of {} bytes",
                    self.descriptor.resolved_path,
                    self.bytes_delivered,
                    self.declared_length
                );
                self.fail();
                Err(ArchiveError::Truncated {
                    delivered: self.bytes_delivered,
                    declared: self.declared_length,
                })
            }
            Ok(n) => {
                let n = n.min(want);
                self.bytes_delivered += n as u64;
                self.check_drained();
                Ok(n)
            }
            Err(e) => {
                tracing::error!("Read failed on {}: {}", self.descriptor.resolved_path, e);
                self.fail();
                Err(e.into())
            }
        }
    }

    /// Release the handle. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.close();
            tracing::debug!(
                "Released {} after {} of {} bytes",
                self.descriptor.resolved_path,
                self.bytes_delivered,
                self.declared_length
            );
        }
        if self.state != StreamState::Failed {
            self.state = StreamState::Closed;
        }
    }

    fn check_drained(&mut self) {
        if self.state == StreamState::Streaming && self.bytes_delivered == self.declared_length {
            self.state = StreamState::Draining;
        }
    }

    fn fail(&mut self) {
        self.state = StreamState::Failed;
        self.close();
    }
}

impl Drop for FileStreamResponse {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ContentNegotiator;
    use crate::storage::memory::MemoryStorage;
    use std::sync::Arc;

    fn open(storage: MemoryStorage, path: &str) -> (FileStreamResponse, Arc<dyn StorageDevice>) {
        let storage: Arc<dyn StorageDevice> = Arc::new(storage);
        let descriptor = ContentNegotiator::new(storage.clone()).resolve(path, None, true);
        let session = FileStreamResponse::open(storage.as_ref(), descriptor).unwrap();
        (session, storage)
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_chunked_fill_sums_to_declared_length() {
        let data = payload(10_000);
        let mut storage = MemoryStorage::new();
        storage.add_file("/logs/big.csv", data.clone());
        let (mut session, _storage) = open(storage, "/logs/big.csv");

        assert_eq!(session.declared_length(), 10_000);

        let mut buf = vec![0u8; 4096];
        let mut lengths = Vec::new();
        let mut out = Vec::new();
        loop {
            let n = session.fill_buffer(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            lengths.push(n);
        }

        assert_eq!(lengths, vec![4096, 4096, 1808]);
        assert_eq!(lengths.iter().sum::<usize>(), 10_000);
        assert_eq!(out, data);
        assert_eq!(session.state(), StreamState::Draining);
    }

    #[test]
    fn test_last_chunk_reports_actual_bytes() {
        let mut storage = MemoryStorage::new();
        storage.add_file("/logs/a.csv", payload(10_000));
        let (mut session, _storage) = open(storage, "/logs/a.csv");

        let mut buf = vec![0xAAu8; 4096];
        let mut calls = 0;
        let mut last = 0;
        while session.remaining() > 0 {
            last = session.fill_buffer(&mut buf).unwrap();
            calls += 1;
        }

        assert_eq!(calls, (10_000 + 4095) / 4096);
        assert_eq!(last, 10_000 - 2 * 4096);
        assert_eq!(session.bytes_delivered(), 10_000);
    }

    #[test]
    fn test_never_reads_past_declared_length() {
        // Directory entry says 5 bytes, file holds 8
        let mut storage = MemoryStorage::new();
        storage.add_short_file("/logs/a.csv", "12345678", 5);
        let (mut session, _storage) = open(storage, "/logs/a.csv");

        let mut buf = [0u8; 64];
        assert_eq!(session.fill_buffer(&mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"12345");
        assert_eq!(session.fill_buffer(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_truncated_file_fails_session() {
        let mut storage = MemoryStorage::new();
        storage.add_short_file("/logs/a.csv", "123", 10);
        let counters = storage.counters();
        let (mut session, _storage) = open(storage, "/logs/a.csv");

        let mut buf = [0u8; 64];
        assert_eq!(session.fill_buffer(&mut buf).unwrap(), 3);
        let err = session.fill_buffer(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::Truncated {
                delivered: 3,
                declared: 10
            }
        ));
        assert_eq!(session.state(), StreamState::Failed);
        assert_eq!(counters.open_handles(), 0);
    }

    #[test]
    fn test_read_error_releases_handle() {
        let mut storage = MemoryStorage::new();
        storage.add_failing_file("/logs/a.csv", payload(100), 50);
        let counters = storage.counters();
        let (mut session, _storage) = open(storage, "/logs/a.csv");

        let mut buf = [0u8; 50];
        assert_eq!(session.fill_buffer(&mut buf).unwrap(), 50);
        assert!(matches!(session.fill_buffer(&mut buf), Err(ArchiveError::Io(_))));
        assert_eq!(session.state(), StreamState::Failed);
        assert_eq!(counters.releases(), 1);

        // Failed sessions stay failed
        session.close();
        assert_eq!(session.state(), StreamState::Failed);
        assert_eq!(session.fill_buffer(&mut buf).unwrap(), 0);
        assert_eq!(counters.releases(), 1);
    }

    #[test]
    fn test_close_twice_releases_once() {
        let mut storage = MemoryStorage::new();
        storage.add_file("/logs/a.csv", payload(10));
        let counters = storage.counters();
        let (mut session, _storage) = open(storage, "/logs/a.csv");

        session.close();
        session.close();
        assert_eq!(session.state(), StreamState::Closed);
        assert_eq!(counters.releases(), 1);

        drop(session);
        assert_eq!(counters.releases(), 1);
    }

    #[test]
    fn test_abort_before_drain_releases_on_drop() {
        let mut storage = MemoryStorage::new();
        storage.add_file("/logs/a.csv", payload(10_000));
        let counters = storage.counters();
        let (mut session, _storage) = open(storage, "/logs/a.csv");

        let mut buf = [0u8; 1024];
        session.fill_buffer(&mut buf).unwrap();
        assert_eq!(counters.open_handles(), 1);

        drop(session);
        assert_eq!(counters.open_handles(), 0);
        assert_eq!(counters.releases(), 1);
    }

    #[test]
    fn test_empty_file_is_drained_immediately() {
        let mut storage = MemoryStorage::new();
        storage.add_file("/logs/empty.csv", Vec::new());
        let counters = storage.counters();
        let (mut session, _storage) = open(storage, "/logs/empty.csv");

        assert_eq!(session.state(), StreamState::Draining);
        assert_eq!(counters.open_handles(), 1);
        let mut buf = [0u8; 16];
        assert_eq!(session.fill_buffer(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let storage: Arc<dyn StorageDevice> = Arc::new(MemoryStorage::new());
        let descriptor = ContentNegotiator::new(storage.clone()).resolve("/missing.csv", None, false);
        let result = FileStreamResponse::open(storage.as_ref(), descriptor);
        assert!(matches!(result, Err(ArchiveError::NotFound(_))));
    }
}
