//! Wire conventions shared by the HTTP server and [`RemoteCache`](crate::RemoteCache).

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use sessmem_sessions::{CacheError, CacheResult};

/// Response header carrying the blacklist verdict (`true` / `false`).
pub const BLACKLISTED_HEADER: &str = "blacklisted";

/// Response header carrying the last-seen instant in unix seconds.
pub const LAST_SEEN_HEADER: &str = "lastseen";

/// Encodes a token signature for use as a path segment.
pub fn encode_signature(signature: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(signature)
}

/// Decodes a signature path segment.
///
/// URL-safe input is accepted with or without padding, and so is the
/// standard alphabet, which older clients send.
pub fn decode_signature(segment: &str) -> CacheResult<Vec<u8>> {
    let engines = [&URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];
    for engine in engines {
        if let Ok(bytes) = engine.decode(segment) {
            return Ok(bytes);
        }
    }
    Err(CacheError::invalid_request(
        "token signature is not valid base64",
    ))
}

/// JSON body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub error: String,

    /// [`CacheError::kind`] of the failure.
    #[serde(default)]
    pub kind: Option<String>,

    /// Variant detail, when the variant carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorBody {
    /// Rebuilds the error this body was produced from.
    pub fn into_error(self, status: u16) -> CacheError {
        CacheError::from_wire(self.kind.as_deref(), self.message, status)
    }
}

impl From<&CacheError> for ErrorBody {
    fn from(err: &CacheError) -> Self {
        Self {
            error: err.to_string(),
            kind: Some(err.kind().to_owned()),
            message: err.detail().map(str::to_owned),
        }
    }
}

/// Query string of `POST /emailCodes/{userId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueCodeQuery {
    pub email: String,
}
