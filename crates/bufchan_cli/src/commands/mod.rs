//! CLI command implementations.

pub mod append;
pub mod read;
pub mod stat;
