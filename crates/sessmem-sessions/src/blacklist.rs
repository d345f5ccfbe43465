//! Revoked token signatures with a freeze-then-enforce rule.
//!
//! A revocation is recorded immediately but only enforced once the freeze
//! window has passed. Requests that were already in flight with the token
//! (a logout racing a request from another device, for instance) still get
//! through during that window.
//!
//! # Storage
//!
//! - Key: `blacklist:{signature}`
//! - Value: revocation instant as unix nanoseconds, 16 bytes big-endian
//! - TTL: the retention window, which must exceed the longest token lifetime

use std::sync::Arc;
use std::time::Duration;

use sessmem_storage::{KvStore, Namespace, StorageError, checked_offset};
use time::OffsetDateTime;

use crate::error::{CacheError, CacheResult};

/// Revocation list for token signatures.
#[derive(Debug)]
pub struct SessionBlacklist<S> {
    store: Arc<S>,
    freeze_window: Duration,
    retention: Duration,
}

impl<S: KvStore> SessionBlacklist<S> {
    /// Creates a blacklist over `store`.
    pub fn new(store: Arc<S>, freeze_window: Duration, retention: Duration) -> Self {
        Self {
            store,
            freeze_window,
            retention,
        }
    }

    /// The configured freeze window.
    pub fn freeze_window(&self) -> Duration {
        self.freeze_window
    }

    /// Revokes `signature`.
    ///
    /// Calling it again resets the recorded instant and so restarts the
    /// freeze window.
    pub fn revoke(&self, signature: &[u8]) -> CacheResult<()> {
        let key = signature_key(signature)?;
        self.store.transact(|tx| {
            let now = tx.now();
            tx.put(&key, &encode_instant(now), Some(self.retention))?;
            Ok::<_, CacheError>(())
        })?;
        tracing::debug!(signature_len = signature.len(), "signature blacklisted");
        Ok(())
    }

    /// Returns `true` if `signature` was revoked at least one freeze window ago.
    pub fn is_blacklisted(&self, signature: &[u8]) -> CacheResult<bool> {
        let key = signature_key(signature)?;
        self.store.transact(|tx| {
            let Some(raw) = tx.get(&key)? else {
                return Ok(false);
            };
            let revoked_at = decode_instant(&raw)?;
            Ok(tx.now() >= checked_offset(revoked_at, self.freeze_window)?)
        })
    }
}

fn signature_key(signature: &[u8]) -> CacheResult<Vec<u8>> {
    if signature.is_empty() {
        return Err(CacheError::invalid_request("token signature is empty"));
    }
    Ok(Namespace::Blacklist.key(signature))
}

fn encode_instant(at: OffsetDateTime) -> [u8; 16] {
    at.unix_timestamp_nanos().to_be_bytes()
}

fn decode_instant(raw: &[u8]) -> Result<OffsetDateTime, StorageError> {
    let bytes: [u8; 16] = raw
        .try_into()
        .map_err(|_| StorageError::corrupted("blacklist entry is not 16 bytes"))?;
    OffsetDateTime::from_unix_timestamp_nanos(i128::from_be_bytes(bytes))
        .map_err(|e| StorageError::corrupted(format!("blacklist instant out of range: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessmem_db_memory::InMemoryStore;
    use sessmem_storage::ManualClock;
    use time::macros::datetime;

    const FREEZE: Duration = Duration::from_secs(15);
    const RETENTION: Duration = Duration::from_secs(30 * 24 * 3600);

    fn blacklist() -> (SessionBlacklist<InMemoryStore>, ManualClock) {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let store = Arc::new(InMemoryStore::new(clock.shared()));
        (SessionBlacklist::new(store, FREEZE, RETENTION), clock)
    }

    #[test]
    fn test_unknown_signature_is_not_blacklisted() {
        let (blacklist, _) = blacklist();
        assert!(!blacklist.is_blacklisted(b"never-seen").unwrap());
    }

    #[test]
    fn test_freeze_window_boundary() {
        let (blacklist, clock) = blacklist();
        blacklist.revoke(b"abc").unwrap();

        assert!(!blacklist.is_blacklisted(b"abc").unwrap());

        clock.advance(Duration::from_secs(14));
        assert!(!blacklist.is_blacklisted(b"abc").unwrap());

        clock.advance(Duration::from_millis(999));
        assert!(!blacklist.is_blacklisted(b"abc").unwrap());

        clock.advance(Duration::from_millis(1));
        assert!(blacklist.is_blacklisted(b"abc").unwrap());

        clock.advance(Duration::from_secs(1));
        assert!(blacklist.is_blacklisted(b"abc").unwrap());
    }

    #[test]
    fn test_re_revocation_restarts_freeze() {
        let (blacklist, clock) = blacklist();
        blacklist.revoke(b"abc").unwrap();
        clock.advance(Duration::from_secs(16));
        assert!(blacklist.is_blacklisted(b"abc").unwrap());

        blacklist.revoke(b"abc").unwrap();
        assert!(!blacklist.is_blacklisted(b"abc").unwrap());

        clock.advance(FREEZE);
        assert!(blacklist.is_blacklisted(b"abc").unwrap());
    }

    #[test]
    fn test_entries_expire_after_retention() {
        let (blacklist, clock) = blacklist();
        blacklist.revoke(b"abc").unwrap();

        clock.advance(RETENTION - Duration::from_secs(1));
        assert!(blacklist.is_blacklisted(b"abc").unwrap());

        clock.advance(Duration::from_secs(1));
        assert!(!blacklist.is_blacklisted(b"abc").unwrap());
    }

    #[test]
    fn test_signatures_are_independent() {
        let (blacklist, clock) = blacklist();
        blacklist.revoke(b"one").unwrap();
        clock.advance(Duration::from_secs(20));

        assert!(blacklist.is_blacklisted(b"one").unwrap());
        assert!(!blacklist.is_blacklisted(b"two").unwrap());
    }

    #[test]
    fn test_zero_freeze_window_enforces_immediately() {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let store = Arc::new(InMemoryStore::new(clock.shared()));
        let blacklist = SessionBlacklist::new(store, Duration::ZERO, RETENTION);

        blacklist.revoke(b"abc").unwrap();
        assert!(blacklist.is_blacklisted(b"abc").unwrap());
    }

    #[test]
    fn test_empty_signature_rejected() {
        let (blacklist, _) = blacklist();
        assert_eq!(
            blacklist.revoke(b"").unwrap_err().kind(),
            "invalid_request"
        );
        assert_eq!(
            blacklist.is_blacklisted(b"").unwrap_err().kind(),
            "invalid_request"
        );
    }

    #[test]
    fn test_corrupted_entry_is_a_storage_error() {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let store = Arc::new(InMemoryStore::new(clock.shared()));
        store
            .put(&Namespace::Blacklist.key(b"abc"), b"garbage", None)
            .unwrap();
        let blacklist = SessionBlacklist::new(store, FREEZE, RETENTION);

        assert_eq!(
            blacklist.is_blacklisted(b"abc").unwrap_err().kind(),
            "storage"
        );
    }

    #[test]
    fn test_retention_beyond_time_range_is_an_error() {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let store = Arc::new(InMemoryStore::new(clock.shared()));
        let ten_thousand_years = Duration::from_secs(10_000 * 365 * 24 * 3600);
        let blacklist = SessionBlacklist::new(store, FREEZE, ten_thousand_years);

        assert_eq!(blacklist.revoke(b"abc").unwrap_err().kind(), "storage");
        assert!(!blacklist.is_blacklisted(b"abc").unwrap());
    }
}
