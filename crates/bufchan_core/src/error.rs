//! Error types for channel operations.

use bufchan_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors that can occur in channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// A construction parameter is out of range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the bad argument.
        message: String,
    },

    /// A caller-supplied buffer cannot take the requested bytes.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the bad input.
        message: String,
    },

    /// The underlying storage handle is closed.
    #[error("channel storage is closed")]
    Closed,

    /// Reading from a caller-supplied source failed.
    #[error("source read failed: {0}")]
    Source(#[source] io::Error),

    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[source] StorageError),
}

impl ChannelError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns true if the storage handle was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<StorageError> for ChannelError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Closed => Self::Closed,
            other => Self::Storage(other),
        }
    }
}
