//! Storage error types for the key-value port.

use std::fmt;

/// Errors that can occur during storage operations.
///
/// A missing key is not an error at this layer: reads return `None`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The underlying engine failed (I/O, locking, commit).
    #[error("Backend error: {message}")]
    Backend {
        /// Description of the engine failure.
        message: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// A stored value does not have the expected layout.
    #[error("Corrupted entry: {message}")]
    Corrupted {
        /// Description of what was malformed.
        message: String,
    },

    /// An instant or TTL falls outside the representable time range.
    #[error("Out of range: {message}")]
    OutOfRange {
        /// Description of the offending computation.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `Backend` error from any displayable engine error.
    #[must_use]
    pub fn backend(err: impl fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(err: impl fmt::Display) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }

    /// Creates a new `Corrupted` error.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a new `OutOfRange` error.
    #[must_use]
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }
}
