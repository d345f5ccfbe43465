//! Wire and storage shapes for email verification codes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A pending email verification code.
///
/// This is both the stored value (JSON, one per user) and the body returned
/// by `POST /emailCodes/{userId}` and `GET /emailCodes/{userId}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCodeData {
    /// Address the code was sent to.
    pub new_email: String,

    /// The single-use code.
    pub code: String,

    /// When the code was issued. Drives the rate-limit cool-down.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When the code stops being accepted.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl EmailCodeData {
    /// Returns `true` if `email` and `code` match exactly.
    #[must_use]
    pub fn matches(&self, email: &str, code: &str) -> bool {
        self.new_email == email && self.code == code
    }

    /// Returns `true` if the code can no longer be verified at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.expires_at
    }
}

/// Body of `POST /emailCodes/{userId}/verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub new_email: String,
    pub code: String,
}
