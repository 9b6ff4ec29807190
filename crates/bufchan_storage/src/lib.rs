//! # bufchan storage
//!
//! Random-access storage handles used underneath a buffered channel.
//!
//! A backend is an **opaque byte store**: it appends at its end, reads at
//! arbitrary offsets, and reports its size. It knows nothing about
//! buffering; that is the channel's job.
//!
//! ## Available Backends
//!
//! - [`FileBackend`] - Persistent storage using OS file APIs
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//!
//! ## Example
//!
//! ```rust
//! use bufchan_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//!
//! backend.close().unwrap();
//! assert!(backend.size().is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
