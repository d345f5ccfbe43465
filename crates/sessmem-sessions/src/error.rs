//! Error taxonomy shared by the embedded and remote access paths.
//!
//! Every variant has a stable [`kind`](CacheError::kind) string and HTTP
//! status. The server encodes errors with them and the remote client decodes
//! them back, so both paths surface the same variant for the same failure.

use sessmem_storage::StorageError;

/// Errors returned by session cache operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// No entry exists (or it has expired).
    #[error("Not found")]
    NotFound,

    /// A verification code was requested before the cool-down elapsed.
    #[error("Email code requested too soon")]
    RateLimited,

    /// Email, code or expiry did not match.
    #[error("Verification failed")]
    VerificationFailed,

    /// The request itself is malformed.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what was wrong.
        message: String,
    },

    /// The underlying store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// The remote instance could not be reached or answered nonsense.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    /// An unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Transport` error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable machine-readable name of the variant.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::VerificationFailed => "verification_failed",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Storage { .. } => "storage",
            Self::Transport { .. } => "transport",
            Self::Internal { .. } => "internal",
        }
    }

    /// HTTP status the network facade answers with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::RateLimited => 429,
            Self::VerificationFailed | Self::InvalidRequest { .. } => 400,
            Self::Storage { .. } | Self::Internal { .. } => 500,
            Self::Transport { .. } => 502,
        }
    }

    /// The free-form detail carried by the variant, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::NotFound | Self::RateLimited | Self::VerificationFailed => None,
            Self::InvalidRequest { message }
            | Self::Storage { message }
            | Self::Transport { message }
            | Self::Internal { message } => Some(message),
        }
    }

    /// Rebuilds an error from its wire form.
    ///
    /// Unknown kinds fall back to the HTTP status class.
    #[must_use]
    pub fn from_wire(kind: Option<&str>, message: Option<String>, status: u16) -> Self {
        let message = message.unwrap_or_default();
        match kind {
            Some("not_found") => Self::NotFound,
            Some("rate_limited") => Self::RateLimited,
            Some("verification_failed") => Self::VerificationFailed,
            Some("invalid_request") => Self::InvalidRequest { message },
            Some("storage") => Self::Storage { message },
            Some("transport") => Self::Transport { message },
            Some("internal") => Self::Internal { message },
            _ => match status {
                404 => Self::NotFound,
                429 => Self::RateLimited,
                400..=499 => Self::InvalidRequest {
                    message: format!("HTTP {status}: {message}"),
                },
                _ => Self::Internal {
                    message: format!("HTTP {status}: {message}"),
                },
            },
        }
    }

    /// Returns `true` for failures caused by the caller's input or the
    /// domain rules rather than by infrastructure.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

impl From<StorageError> for CacheError {
    fn from(err: StorageError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage {
            message: format!("stored value is not valid JSON: {err}"),
        }
    }
}

/// Type alias for results of cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip_preserves_variant() {
        let errors = [
            CacheError::NotFound,
            CacheError::RateLimited,
            CacheError::VerificationFailed,
            CacheError::invalid_request("bad uuid"),
            CacheError::storage("disk full"),
            CacheError::transport("connection refused"),
            CacheError::internal("join error"),
        ];

        for err in errors {
            let rebuilt = CacheError::from_wire(
                Some(err.kind()),
                err.detail().map(str::to_owned),
                err.status_code(),
            );
            assert_eq!(rebuilt, err);
        }
    }

    #[test]
    fn test_unknown_kind_falls_back_to_status() {
        assert_eq!(CacheError::from_wire(None, None, 404), CacheError::NotFound);
        assert_eq!(
            CacheError::from_wire(Some("teapot"), None, 429),
            CacheError::RateLimited
        );
        assert_eq!(
            CacheError::from_wire(None, Some("boom".into()), 503).kind(),
            "internal"
        );
    }

    #[test]
    fn test_domain_failures_are_client_errors() {
        assert!(CacheError::RateLimited.is_client_error());
        assert!(CacheError::VerificationFailed.is_client_error());
        assert!(!CacheError::storage("io").is_client_error());
    }

    #[test]
    fn test_storage_error_conversion() {
        let err: CacheError = StorageError::backend("lock poisoned").into();
        assert_eq!(err.kind(), "storage");
        assert_eq!(err.detail(), Some("Backend error: lock poisoned"));
    }
}
