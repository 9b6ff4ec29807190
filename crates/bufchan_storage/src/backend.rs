//! Storage backend trait definition.

use crate::error::StorageResult;

/// A random-access, append-at-end byte store.
///
/// Backends are **opaque byte stores**. The buffered channel sits on top of
/// one and decides when bytes reach it; the backend only has to make each
/// call behave atomically.
///
/// # Invariants
///
/// - `append` returns the offset where data was written and grows `size`
///   by exactly `data.len()`, or fails and leaves `size` unchanged
/// - `read_at` is positional and unaffected by any append cursor
/// - after `close`, every call except `close` and `is_closed` fails with
///   [`StorageError::Closed`](crate::StorageError::Closed)
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For persistent storage
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - The backend is closed
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or an I/O error occurs.
    /// A failed append leaves the size unchanged.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes appended data out of user-space buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// This is the offset where the next `append` will write.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is closed or the size cannot be
    /// determined.
    fn size(&self) -> StorageResult<u64>;

    /// Forces all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Releases the underlying resource.
    ///
    /// Closing an already closed backend is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if releasing the resource fails.
    fn close(&mut self) -> StorageResult<()>;

    /// Returns true once [`close`](Self::close) has been called.
    fn is_closed(&self) -> bool;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn close(&mut self) -> StorageResult<()> {
        (**self).close()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}
