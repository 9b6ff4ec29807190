//! # bufchan core
//!
//! A buffered random-access channel over an append-only file.
//!
//! [`BufferedChannel`] coalesces small writes into an in-memory buffer and
//! appends them to a [`StorageBackend`] in bulk. Reads see every accepted
//! byte, whether it already reached the file or still sits in the buffer.
//!
//! ## Flush policy
//!
//! After every write the channel evaluates, in order:
//!
//! 1. If an unpersisted-bytes bound is set and reached, drain the whole
//!    buffer (and optionally sync the file).
//! 2. Otherwise, if the buffer holds `capacity` bytes or more, drain it.
//!
//! ## Example
//!
//! ```rust
//! use bufchan_core::BufferedChannel;
//! use bufchan_storage::InMemoryBackend;
//!
//! let mut channel = BufferedChannel::new(InMemoryBackend::new(), 8).unwrap();
//! channel.write(b"hello").unwrap();
//! assert_eq!(channel.file_position(), 0);
//!
//! // Buffered bytes are readable before they are flushed.
//! assert_eq!(channel.read_to_vec(0, 5).unwrap(), b"hello");
//!
//! channel.write(b" world").unwrap();
//! assert_eq!(channel.file_position(), 11);
//! assert_eq!(channel.position(), 11);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod alloc;
mod channel;
mod config;
mod error;

pub use alloc::{BufferAllocator, HeapAllocator, MAX_PREALLOCATION};
pub use bufchan_storage::{StorageBackend, StorageError};
pub use channel::BufferedChannel;
pub use config::{ChannelConfig, DEFAULT_CAPACITY};
pub use error::{ChannelError, ChannelResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
