//! Key namespacing for the logical collections sharing one physical store.

use std::fmt;

use uuid::Uuid;

/// A logical collection inside the shared store.
///
/// Every key written by the session components starts with the namespace
/// prefix, so collections never collide even though they live in the same
/// table of the same file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Revoked token signatures.
    Blacklist,
    /// Per-user last activity. Reserved; currently nothing is written.
    LastSeen,
    /// Pending email verification codes, one slot per user.
    EmailCodes,
}

impl Namespace {
    /// Returns the byte prefix (including the `:` separator).
    #[must_use]
    pub const fn prefix(self) -> &'static [u8] {
        match self {
            Self::Blacklist => b"blacklist:",
            Self::LastSeen => b"lastSeen:",
            Self::EmailCodes => b"emailCodes:",
        }
    }

    /// Builds the storage key for `id` in this namespace.
    #[must_use]
    pub fn key(self, id: &[u8]) -> Vec<u8> {
        let prefix = self.prefix();
        let mut key = Vec::with_capacity(prefix.len() + id.len());
        key.extend_from_slice(prefix);
        key.extend_from_slice(id);
        key
    }

    /// Builds the storage key for a user id in this namespace.
    #[must_use]
    pub fn user_key(self, user_id: Uuid) -> Vec<u8> {
        self.key(user_id.as_bytes())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blacklist => write!(f, "blacklist"),
            Self::LastSeen => write!(f, "lastSeen"),
            Self::EmailCodes => write!(f, "emailCodes"),
        }
    }
}
