//! Fault injection.
//!
//! [`FaultyBackend`] wraps an [`InMemoryBackend`] and fails on command. The
//! [`FaultHandle`] returned alongside it stays with the test after the
//! backend has been moved into a channel.

use bufchan_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct FaultState {
    failing_appends: AtomicUsize,
    fail_reads: AtomicBool,
    fail_syncs: AtomicBool,
    closed: AtomicBool,
    append_calls: AtomicU64,
    sync_calls: AtomicU64,
}

/// Remote control for a [`FaultyBackend`].
#[derive(Debug, Clone)]
pub struct FaultHandle {
    state: Arc<FaultState>,
}

impl FaultHandle {
    /// Makes the next `count` appends fail with an I/O error.
    pub fn fail_next_appends(&self, count: usize) {
        self.state.failing_appends.store(count, Ordering::SeqCst);
    }

    /// Makes every read fail until turned off again.
    pub fn fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every sync fail until turned off again.
    pub fn fail_syncs(&self, fail: bool) {
        self.state.fail_syncs.store(fail, Ordering::SeqCst);
    }

    /// Closes the backend behind the channel's back.
    pub fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }

    /// Number of append calls seen so far, failed ones included.
    #[must_use]
    pub fn append_calls(&self) -> u64 {
        self.state.append_calls.load(Ordering::SeqCst)
    }

    /// Number of sync calls seen so far.
    #[must_use]
    pub fn sync_calls(&self) -> u64 {
        self.state.sync_calls.load(Ordering::SeqCst)
    }
}

/// An in-memory backend that fails when told to.
#[derive(Debug)]
pub struct FaultyBackend {
    inner: InMemoryBackend,
    state: Arc<FaultState>,
}

impl FaultyBackend {
    /// Creates an empty faulty backend and its handle.
    #[must_use]
    pub fn new() -> (Self, FaultHandle) {
        Self::with_data(Vec::new())
    }

    /// Creates a faulty backend with pre-existing data.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> (Self, FaultHandle) {
        let state = Arc::new(FaultState::default());
        let backend = Self {
            inner: InMemoryBackend::with_data(data),
            state: Arc::clone(&state),
        };
        (backend, FaultHandle { state })
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.inner.data()
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

fn injected(what: &str) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, format!("injected {what} failure")))
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.ensure_open()?;
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("read"));
        }
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.ensure_open()?;
        self.state.append_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.state.failing_appends.load(Ordering::SeqCst);
        if failing > 0 {
            self.state.failing_appends.store(failing - 1, Ordering::SeqCst);
            return Err(injected("append"));
        }
        self.inner.append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.ensure_open()?;
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.ensure_open()?;
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.ensure_open()?;
        self.state.sync_calls.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_syncs.load(Ordering::SeqCst) {
            return Err(injected("sync"));
        }
        self.inner.sync()
    }

    fn close(&mut self) -> StorageResult<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst) || self.inner.is_closed()
    }
}

/// A reader that yields `data` and then fails instead of reporting EOF.
#[derive(Debug)]
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    /// Creates a reader that fails after handing out `data`.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl io::Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "source is corrupted"));
        }
        let n = buf.len().min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
