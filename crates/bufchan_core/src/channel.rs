//! The buffered channel.

use crate::alloc::{BufferAllocator, HeapAllocator, MAX_PREALLOCATION};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, ChannelResult};
use bufchan_storage::StorageBackend;
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{ErrorKind, Read};
use tracing::{debug, trace, warn};

/// Largest chunk pulled from a reader in one go by `write_from`.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// What caused a buffer drain. Only used for logging.
#[derive(Debug, Clone, Copy)]
enum FlushTrigger {
    Explicit,
    Capacity,
    Bound,
}

/// A write-buffered, random-access view over a storage backend.
///
/// Writes land in an in-memory buffer and reach the backend in bulk. Reads
/// cover the whole logical range `[0, position())`: the part below
/// [`file_position`](Self::file_position) comes from the backend, the rest
/// from the buffer.
///
/// # Flush policy
///
/// After each write, evaluated in this order:
///
/// 1. bound > 0 and unpersisted bytes >= bound: drain the whole buffer and,
///    if configured, sync the backend.
/// 2. otherwise, buffer holding `capacity` bytes or more: drain the whole
///    buffer.
///
/// After a successful write the buffer always holds fewer than `capacity`
/// bytes. A write larger than the buffer grows it only for the duration of
/// the call; the extra reservation is released once the bytes are drained.
///
/// # Atomicity
///
/// A drain either appends every buffered byte or fails with the buffer and
/// counters untouched. A write whose drain fails is rolled back, so it
/// either takes effect entirely or not at all.
///
/// # Concurrency
///
/// There is no internal locking. Writes and flushes take `&mut self`, reads
/// take `&self`; wrap the channel in a lock to share it between threads.
///
/// Dropping a channel discards any buffered bytes. Call [`flush`],
/// [`sync`] or [`close`] first.
///
/// [`flush`]: Self::flush
/// [`sync`]: Self::sync
/// [`close`]: Self::close
pub struct BufferedChannel<B: StorageBackend> {
    backend: B,
    write_buffer: BytesMut,
    capacity: usize,
    unpersisted_bytes_bound: u64,
    sync_on_bound: bool,
    unpersisted_bytes: u64,
    file_position: u64,
}

impl<B: StorageBackend> BufferedChannel<B> {
    /// Creates a channel with the given write buffer capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidArgument`] if `capacity` is zero,
    /// [`ChannelError::Closed`] if the backend is closed.
    pub fn new(backend: B, capacity: usize) -> ChannelResult<Self> {
        Self::with_config(backend, ChannelConfig::new().capacity(capacity))
    }

    /// Creates a channel that also flushes once `bound` bytes are unpersisted.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_bound(backend: B, capacity: usize, bound: u64) -> ChannelResult<Self> {
        Self::with_config(
            backend,
            ChannelConfig::new()
                .capacity(capacity)
                .unpersisted_bytes_bound(bound),
        )
    }

    /// Creates a channel from a configuration.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_config(backend: B, config: ChannelConfig) -> ChannelResult<Self> {
        Self::with_allocator(&HeapAllocator, backend, config)
    }

    /// Creates a channel whose write buffer comes from `allocator`.
    ///
    /// The backend may already hold data; the channel starts at its end.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidArgument`] for an invalid config,
    /// [`ChannelError::Closed`] if the backend is closed, or a storage
    /// error if its size cannot be read.
    pub fn with_allocator<A>(
        allocator: &A,
        backend: B,
        config: ChannelConfig,
    ) -> ChannelResult<Self>
    where
        A: BufferAllocator + ?Sized,
    {
        config.validate()?;
        if backend.is_closed() {
            return Err(ChannelError::Closed);
        }
        let file_position = backend.size()?;
        let mut write_buffer = allocator.allocate(config.capacity);
        write_buffer.clear();

        debug!(
            capacity = config.capacity,
            bound = config.unpersisted_bytes_bound,
            file_position,
            "opened buffered channel"
        );

        Ok(Self {
            backend,
            write_buffer,
            capacity: config.capacity,
            unpersisted_bytes_bound: config.unpersisted_bytes_bound,
            sync_on_bound: config.sync_on_bound,
            unpersisted_bytes: 0,
            file_position,
        })
    }

    /// Accepts `src` into the channel.
    ///
    /// The bytes are buffered and the flush policy runs. An empty `src` is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the backend is closed, or a
    /// storage error if a triggered flush fails. In the latter case the write
    /// is undone and [`position`](Self::position) is unchanged, unless the
    /// bytes already reached the backend and only the follow-up sync failed.
    pub fn write(&mut self, src: &[u8]) -> ChannelResult<()> {
        self.ensure_open()?;
        if src.is_empty() {
            return Ok(());
        }

        let mark = self.write_buffer.len();
        let durable_before = self.file_position;
        self.write_buffer.extend_from_slice(src);
        self.unpersisted_bytes += src.len() as u64;
        trace!(len = src.len(), buffered = self.write_buffer.len(), "write");

        if let Err(err) = self.apply_flush_policy() {
            if self.file_position == durable_before {
                self.write_buffer.truncate(mark);
                self.unpersisted_bytes -= src.len() as u64;
                self.release_excess();
            }
            return Err(err);
        }
        Ok(())
    }

    /// Streams `source` into the channel until it reports end of input.
    ///
    /// Returns the number of bytes accepted. Interrupted reads are retried.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Source`] if reading `source` fails. Bytes
    /// read before the failure stay accepted and have been through the
    /// flush policy. Any error from [`write`](Self::write) is passed on.
    pub fn write_from<R: Read>(&mut self, mut source: R) -> ChannelResult<u64> {
        self.ensure_open()?;

        let mut chunk = vec![0u8; self.capacity.min(READ_CHUNK_SIZE)];
        let mut total = 0u64;
        loop {
            let n = match source.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    debug!(accepted = total, error = %err, "source read failed");
                    return Err(ChannelError::Source(err));
                }
            };
            self.write(&chunk[..n])?;
            total += n as u64;
        }
        Ok(total)
    }

    /// Appends the buffered tail to the backend.
    ///
    /// Does nothing if the buffer is empty.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the backend is closed or a storage
    /// error if the append fails; the buffer is then left as it was.
    pub fn flush(&mut self) -> ChannelResult<()> {
        self.ensure_open()?;
        self.drain(FlushTrigger::Explicit)
    }

    /// Flushes and then forces the backend to durable storage.
    ///
    /// Returns the durable position.
    ///
    /// # Errors
    ///
    /// Same as [`flush`](Self::flush), plus any error from the sync.
    pub fn sync(&mut self) -> ChannelResult<u64> {
        self.flush()?;
        self.backend.sync()?;
        Ok(self.file_position)
    }

    /// Copies up to `len` bytes starting at `position` into `dest`.
    ///
    /// Returns the number of bytes copied, which is `len` clamped to the
    /// end of the logical range. Reading at or beyond
    /// [`position`](Self::position) returns 0.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the backend is closed,
    /// [`ChannelError::InvalidInput`] if `dest` cannot take the bytes (in
    /// which case nothing is copied), or a storage error from the backend.
    pub fn read<D: BufMut>(
        &self,
        dest: &mut D,
        position: u64,
        len: usize,
    ) -> ChannelResult<usize> {
        self.ensure_open()?;

        let end = self.position();
        if len == 0 || position >= end {
            return Ok(0);
        }
        // Bounded by `len`, so the cast back to usize cannot truncate.
        let available = (len as u64).min(end - position) as usize;

        if dest.remaining_mut() < available {
            return Err(ChannelError::invalid_input(format!(
                "destination has room for {} bytes, read needs {}",
                dest.remaining_mut(),
                available
            )));
        }

        let mut copied = 0usize;
        if position < self.file_position {
            let from_file = (available as u64).min(self.file_position - position) as usize;
            let bytes = self.backend.read_at(position, from_file)?;
            dest.put_slice(&bytes);
            copied = from_file;
        }
        if copied < available {
            let start = (position + copied as u64 - self.file_position) as usize;
            let from_buffer = available - copied;
            dest.put_slice(&self.write_buffer[start..start + from_buffer]);
            copied += from_buffer;
        }

        trace!(position, requested = len, copied, "read");
        Ok(copied)
    }

    /// Reads up to `len` bytes starting at `position` into a new vector.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub fn read_to_vec(&self, position: u64, len: usize) -> ChannelResult<Vec<u8>> {
        let remaining = self.position().saturating_sub(position);
        let mut out = Vec::with_capacity((len as u64).min(remaining) as usize);
        self.read(&mut out, position, len)?;
        Ok(out)
    }

    /// Returns the logical end of data: durable bytes plus buffered bytes.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.file_position + self.write_buffer.len() as u64
    }

    /// Returns how many bytes have reached the backend.
    #[must_use]
    pub fn file_position(&self) -> u64 {
        self.file_position
    }

    /// Returns how many bytes are waiting in the write buffer.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.write_buffer.len()
    }

    /// Returns the bytes accepted since the last flush.
    #[must_use]
    pub fn unpersisted_bytes(&self) -> u64 {
        self.unpersisted_bytes
    }

    /// Returns the write buffer capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the unpersisted-bytes bound (0 = disabled).
    #[must_use]
    pub fn unpersisted_bytes_bound(&self) -> u64 {
        self.unpersisted_bytes_bound
    }

    /// Returns the underlying backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Discards the buffered tail without writing it.
    pub fn clear(&mut self) {
        if !self.write_buffer.is_empty() {
            debug!(discarded = self.write_buffer.len(), "cleared write buffer");
        }
        self.write_buffer.clear();
        self.unpersisted_bytes = 0;
    }

    /// Flushes and hands the backend back to the caller.
    ///
    /// The backend is not closed; that stays the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns the flush error if the buffered tail cannot be written. The
    /// channel is consumed either way, so call [`flush`](Self::flush) first
    /// when a retry matters.
    pub fn close(mut self) -> ChannelResult<B> {
        self.flush()?;
        Ok(self.backend)
    }

    /// Takes the channel apart without any I/O.
    ///
    /// Returns the backend and the bytes that were never flushed.
    #[must_use]
    pub fn into_inner(self) -> (B, Bytes) {
        (self.backend, self.write_buffer.freeze())
    }

    fn ensure_open(&self) -> ChannelResult<()> {
        if self.backend.is_closed() {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    fn apply_flush_policy(&mut self) -> ChannelResult<()> {
        if self.unpersisted_bytes_bound > 0
            && self.unpersisted_bytes >= self.unpersisted_bytes_bound
        {
            self.drain(FlushTrigger::Bound)?;
            if self.sync_on_bound {
                self.backend.sync()?;
            }
            return Ok(());
        }

        while self.write_buffer.len() >= self.capacity {
            self.drain(FlushTrigger::Capacity)?;
        }
        Ok(())
    }

    fn drain(&mut self, trigger: FlushTrigger) -> ChannelResult<()> {
        let len = self.write_buffer.len();
        if len == 0 {
            return Ok(());
        }

        let offset = match self.backend.append(&self.write_buffer) {
            Ok(offset) => offset,
            Err(err) => {
                warn!(?trigger, len, error = %err, "flush failed, keeping buffered bytes");
                return Err(err.into());
            }
        };
        if offset != self.file_position {
            warn!(
                expected = self.file_position,
                actual = offset,
                "backend grew behind the channel, resyncing position"
            );
        }

        self.file_position = offset + len as u64;
        self.write_buffer.clear();
        self.release_excess();
        self.unpersisted_bytes = 0;
        debug!(?trigger, len, file_position = self.file_position, "flushed write buffer");

        self.backend.flush()?;
        Ok(())
    }

    /// Drops a reservation that an oversized write left behind.
    fn release_excess(&mut self) {
        let limit = self.capacity.max(MAX_PREALLOCATION);
        if self.write_buffer.capacity() > limit {
            trace!(reserved = self.write_buffer.capacity(), "releasing write buffer");
            let mut fresh = HeapAllocator.allocate(self.capacity);
            fresh.extend_from_slice(&self.write_buffer);
            self.write_buffer = fresh;
        }
    }
}

impl<B: StorageBackend> std::fmt::Debug for BufferedChannel<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferedChannel")
            .field("capacity", &self.capacity)
            .field("unpersisted_bytes_bound", &self.unpersisted_bytes_bound)
            .field("file_position", &self.file_position)
            .field("buffered", &self.write_buffer.len())
            .field("unpersisted_bytes", &self.unpersisted_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bufchan_storage::{FileBackend, InMemoryBackend};
    use tempfile::tempdir;

    fn data(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn write_below_capacity_stays_buffered() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(&data(5)).unwrap();

        assert_eq!(channel.position(), 5);
        assert_eq!(channel.buffered_len(), 5);
        assert_eq!(channel.file_position(), 0);
        assert!(channel.backend().data().is_empty());
    }

    #[test]
    fn write_exactly_capacity_drains() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        let payload = data(10);
        channel.write(&payload).unwrap();

        assert_eq!(channel.buffered_len(), 0);
        assert_eq!(channel.file_position(), 10);
        assert_eq!(channel.backend().data(), payload);
    }

    #[test]
    fn oversized_write_does_not_keep_its_reservation() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(&vec![7u8; 4 * MAX_PREALLOCATION]).unwrap();

        assert_eq!(channel.buffered_len(), 0);
        assert_eq!(channel.file_position(), 4 * MAX_PREALLOCATION as u64);
        assert!(channel.write_buffer.capacity() <= MAX_PREALLOCATION);

        channel.write(b"abc").unwrap();
        assert_eq!(channel.read_to_vec(0, 2).unwrap(), [7, 7]);
        assert_eq!(channel.buffered_len(), 3);
    }

    #[test]
    fn backend_growth_behind_channel_is_resynced() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"abc").unwrap();
        channel.flush().unwrap();

        // Bytes appended past the channel's view of the file.
        channel.backend.append(b"xy").unwrap();
        channel.write(b"z").unwrap();
        channel.flush().unwrap();

        assert_eq!(channel.file_position(), 6);
        assert_eq!(channel.position(), 6);
        assert_eq!(channel.backend().data(), b"abcxyz");
    }

    #[test]
    fn write_over_capacity_drains_fully() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        let payload = data(15);
        channel.write(&payload).unwrap();

        assert_eq!(channel.position(), 15);
        assert_eq!(channel.buffered_len(), 0);
        assert_eq!(channel.backend().data(), payload);
    }

    #[test]
    fn accumulated_writes_drain_when_over_capacity() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"abcdef").unwrap();
        channel.write(b"ghi").unwrap();
        assert_eq!(channel.file_position(), 0);

        channel.write(b"j").unwrap();
        assert_eq!(channel.file_position(), 10);
        assert_eq!(channel.backend().data(), b"abcdefghij");
    }

    #[test]
    fn bound_forces_full_drain() {
        let mut channel = BufferedChannel::with_bound(InMemoryBackend::new(), 10, 4).unwrap();
        channel.write(&data(5)).unwrap();

        assert_eq!(channel.file_position(), 5);
        assert_eq!(channel.buffered_len(), 0);
        assert_eq!(channel.unpersisted_bytes(), 0);
    }

    #[test]
    fn bound_not_reached_keeps_bytes() {
        let mut channel = BufferedChannel::with_bound(InMemoryBackend::new(), 10, 6).unwrap();
        channel.write(&data(5)).unwrap();

        assert_eq!(channel.file_position(), 0);
        assert_eq!(channel.unpersisted_bytes(), 5);

        channel.write(&data(1)).unwrap();
        assert_eq!(channel.file_position(), 6);
        assert_eq!(channel.unpersisted_bytes(), 0);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = BufferedChannel::new(InMemoryBackend::new(), 0).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidArgument { .. }));
    }

    #[test]
    fn closed_backend_is_rejected_at_construction() {
        let mut backend = InMemoryBackend::new();
        backend.close().unwrap();
        let err = BufferedChannel::new(backend, 10).unwrap_err();
        assert!(err.is_closed());
    }

    #[test]
    fn empty_write_is_noop() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"").unwrap();
        assert_eq!(channel.position(), 0);
        assert_eq!(channel.unpersisted_bytes(), 0);
    }

    #[test]
    fn starts_at_existing_file_length() {
        let backend = InMemoryBackend::with_data(b"abcdef".to_vec());
        let mut channel = BufferedChannel::new(backend, 10).unwrap();
        assert_eq!(channel.position(), 6);

        channel.write(b"gh").unwrap();
        assert_eq!(channel.position(), 8);
        assert_eq!(channel.read_to_vec(0, 8).unwrap(), b"abcdefgh");
    }

    #[test]
    fn read_spans_file_and_buffer() {
        let backend = InMemoryBackend::with_data(b"012345".to_vec());
        let mut channel = BufferedChannel::new(backend, 10).unwrap();
        channel.write(b"6789a").unwrap();

        let mut out = Vec::new();
        let n = channel.read(&mut out, 4, 4).unwrap();
        assert_eq!(n, 4);
        assert_eq!(out, b"4567");

        assert_eq!(channel.read_to_vec(8, 3).unwrap(), b"89a");
        assert_eq!(channel.read_to_vec(2, 2).unwrap(), b"23");
    }

    #[test]
    fn read_is_clamped_to_end() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"hello").unwrap();

        assert_eq!(channel.read_to_vec(3, 100).unwrap(), b"lo");
        assert!(channel.read_to_vec(5, 1).unwrap().is_empty());
        assert!(channel.read_to_vec(50, 1).unwrap().is_empty());
        assert!(channel.read_to_vec(0, 0).unwrap().is_empty());
    }

    #[test]
    fn read_into_fixed_slice() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 4).unwrap();
        channel.write(b"abcdef").unwrap();
        channel.write(b"gh").unwrap();

        let mut buf = [0u8; 4];
        let mut dest = &mut buf[..];
        assert_eq!(channel.read(&mut dest, 4, 4).unwrap(), 4);
        assert_eq!(&buf, b"efgh");
    }

    #[test]
    fn read_into_small_slice_fails_without_copying() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"abcdef").unwrap();

        let mut buf = [0u8; 2];
        let mut dest = &mut buf[..];
        let err = channel.read(&mut dest, 0, 4).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidInput { .. }));
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn flush_is_idempotent() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"abc").unwrap();
        channel.flush().unwrap();
        channel.flush().unwrap();

        assert_eq!(channel.backend().data(), b"abc");
        assert_eq!(channel.unpersisted_bytes(), 0);
        assert_eq!(channel.position(), 3);
    }

    #[test]
    fn write_from_reader_streams_everything() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 4).unwrap();
        let payload = data(23);
        let accepted = channel.write_from(&payload[..]).unwrap();

        assert_eq!(accepted, 23);
        assert_eq!(channel.position(), 23);
        assert!(channel.buffered_len() < 4);
        assert_eq!(channel.read_to_vec(0, 23).unwrap(), payload);
    }

    #[test]
    fn clear_discards_tail() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"keep").unwrap();
        channel.flush().unwrap();
        channel.write(b"drop").unwrap();
        channel.clear();

        assert_eq!(channel.position(), 4);
        assert_eq!(channel.unpersisted_bytes(), 0);
        assert_eq!(channel.read_to_vec(0, 10).unwrap(), b"keep");
    }

    #[test]
    fn closed_backend_rejects_operations() {
        let mut channel = BufferedChannel::new(InMemoryBackend::new(), 10).unwrap();
        channel.write(b"abc").unwrap();

        let (mut backend, pending) = channel.into_inner();
        assert_eq!(&pending[..], b"abc");
        backend.close().unwrap();

        // The constructor refuses closed handles, so assemble one directly.
        let mut channel = BufferedChannel {
            backend,
            write_buffer: BytesMut::new(),
            capacity: 10,
            unpersisted_bytes_bound: 0,
            sync_on_bound: false,
            unpersisted_bytes: 0,
            file_position: 0,
        };
        assert!(channel.write(b"x").unwrap_err().is_closed());
        assert!(channel.flush().unwrap_err().is_closed());
        assert!(channel.read_to_vec(0, 1).unwrap_err().is_closed());
        assert_eq!(channel.position(), 0);
    }

    #[test]
    fn close_flushes_and_returns_backend() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("channel.log");

        let mut channel = BufferedChannel::new(FileBackend::open(&path).unwrap(), 64).unwrap();
        channel.write(b"durable").unwrap();
        let backend = channel.close().unwrap();

        assert_eq!(backend.size().unwrap(), 7);
        assert_eq!(std::fs::read(&path).unwrap(), b"durable");
    }

    #[test]
    fn sync_returns_durable_position() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("channel.log");

        let mut channel = BufferedChannel::new(FileBackend::open(&path).unwrap(), 64).unwrap();
        channel.write(b"abc").unwrap();
        assert_eq!(channel.sync().unwrap(), 3);
        assert_eq!(channel.buffered_len(), 0);
    }

    #[test]
    fn custom_allocator_is_used() {
        use std::cell::Cell;

        let calls = Cell::new(0);
        let alloc = |capacity: usize| {
            calls.set(calls.get() + 1);
            BytesMut::with_capacity(capacity)
        };
        let config = ChannelConfig::new().capacity(16);
        let channel =
            BufferedChannel::with_allocator(&alloc, InMemoryBackend::new(), config).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(channel.capacity(), 16);
    }
}
