//! # bufchan testkit
//!
//! Test utilities for bufchan.
//!
//! This crate provides:
//! - A fault-injecting storage backend and a failing reader
//! - Temporary file fixtures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use bufchan_storage::StorageBackend;
//! use bufchan_testkit::prelude::*;
//!
//! let (mut backend, faults) = FaultyBackend::new();
//! faults.fail_next_appends(1);
//! assert!(backend.append(b"lost").is_err());
//! assert_eq!(backend.append(b"kept").unwrap(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
