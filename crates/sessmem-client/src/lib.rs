//! # sessmem-client
//!
//! One interface, [`SessionCache`], over two interchangeable access paths:
//!
//! - [`EmbeddedCache`] owns the store and runs the session components in
//!   this process
//! - [`RemoteCache`] forwards every call over HTTP to the process that owns
//!   the store
//!
//! The mode is picked once, at [`connect`] time. Both paths return the same
//! outcome (and the same [`CacheError`] variant) for the same sequence of
//! calls.
//!
//! ```ignore
//! use sessmem_client::{CacheTarget, connect};
//!
//! let cache = connect(CacheTarget::Remote { base_url: "http://mem:8080".into() })?;
//! cache.blacklist(signature).await?;
//! ```

mod embedded;
mod remote;
mod target;
pub mod wire;

use std::fmt;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

pub use embedded::EmbeddedCache;
pub use remote::RemoteCache;
pub use sessmem_sessions::{CacheError, CacheResult, EmailCodeData, SessionSettings};
pub use target::{CacheTarget, connect};

/// Which access path a [`SessionCache`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Embedded,
    Remote,
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embedded => write!(f, "embedded"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// The session cache capability set.
#[async_trait]
pub trait SessionCache: Send + Sync + fmt::Debug {
    /// Revokes a token signature. Enforcement starts after the freeze window.
    async fn blacklist(&self, signature: &[u8]) -> CacheResult<()>;

    /// Returns `true` if the signature was revoked at least one freeze
    /// window ago.
    async fn is_blacklisted(&self, signature: &[u8]) -> CacheResult<bool>;

    /// Records user activity. Currently discarded.
    async fn save_last_seen(&self, user_id: Uuid) -> CacheResult<()>;

    /// Reads the last activity instant. Currently always the Unix epoch.
    async fn get_last_seen(&self, user_id: Uuid) -> CacheResult<OffsetDateTime>;

    /// Issues a verification code for `email`, subject to the cool-down.
    async fn issue_code(&self, user_id: Uuid, email: &str) -> CacheResult<EmailCodeData>;

    /// Verifies and consumes the pending code.
    async fn verify_code(&self, user_id: Uuid, email: &str, code: &str) -> CacheResult<()>;

    /// Returns the pending code, if any.
    async fn pending_code(&self, user_id: Uuid) -> CacheResult<Option<EmailCodeData>>;

    /// The access path of this implementation.
    fn mode(&self) -> CacheMode;
}
