//! Channel configuration.

use crate::error::{ChannelError, ChannelResult};

/// Default write buffer capacity (64 KiB).
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

/// Configuration for a [`BufferedChannel`](crate::BufferedChannel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Maximum bytes the write buffer may hold once a write returns.
    pub capacity: usize,

    /// Unpersisted bytes that force a flush (0 = disabled).
    pub unpersisted_bytes_bound: u64,

    /// Whether a bound-triggered flush also syncs the file to disk.
    pub sync_on_bound: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            unpersisted_bytes_bound: 0, // disabled
            sync_on_bound: true,
        }
    }
}

impl ChannelConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the write buffer capacity.
    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the unpersisted-bytes bound.
    #[must_use]
    pub const fn unpersisted_bytes_bound(mut self, bound: u64) -> Self {
        self.unpersisted_bytes_bound = bound;
        self
    }

    /// Sets whether a bound-triggered flush also syncs.
    #[must_use]
    pub const fn sync_on_bound(mut self, value: bool) -> Self {
        self.sync_on_bound = value;
        self
    }

    /// Checks that the configuration can back a channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidArgument`] if the capacity is zero.
    pub fn validate(&self) -> ChannelResult<()> {
        if self.capacity == 0 {
            return Err(ChannelError::invalid_argument(
                "write buffer capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
