//! Write buffer allocation.

use bytes::BytesMut;

/// Largest up-front reservation [`HeapAllocator`] makes (1 MiB).
///
/// Buffers for larger capacities start at this size and grow on demand.
pub const MAX_PREALLOCATION: usize = 1024 * 1024;

/// Produces the staging buffer a channel writes into.
///
/// Any `Fn(usize) -> BytesMut` closure is an allocator, which keeps tests
/// and pooled setups cheap to wire up.
pub trait BufferAllocator {
    /// Returns an empty buffer meant to hold up to `capacity` bytes.
    fn allocate(&self, capacity: usize) -> BytesMut;
}

/// Allocates buffers on the heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, capacity: usize) -> BytesMut {
        BytesMut::with_capacity(capacity.min(MAX_PREALLOCATION))
    }
}

impl<F> BufferAllocator for F
where
    F: Fn(usize) -> BytesMut,
{
    fn allocate(&self, capacity: usize) -> BytesMut {
        self(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heap_allocator_reserves_capacity() {
        let buf = HeapAllocator.allocate(128);
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 128);
    }

    #[test]
    fn heap_allocator_caps_reservation() {
        let buf = HeapAllocator.allocate(usize::MAX);
        assert!(buf.is_empty());
        assert!(buf.capacity() < usize::MAX);
    }

    #[test]
    fn closures_are_allocators() {
        let alloc = |capacity: usize| BytesMut::with_capacity(capacity * 2);
        assert!(alloc.allocate(8).capacity() >= 16);
    }
}
