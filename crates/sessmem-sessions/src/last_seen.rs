//! Per-user last-seen timestamps.
//!
//! This path is intentionally inert: recording always succeeds and stores
//! nothing, and reads always succeed with the Unix epoch. The operations are
//! kept because callers (and the `/lastSeen` routes) depend on them being
//! present. The `lastSeen:` namespace stays reserved for when tracking is
//! turned back on.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::CacheResult;

/// No-op last-seen tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct LastSeenStore;

impl LastSeenStore {
    /// Creates the tracker.
    pub fn new() -> Self {
        Self
    }

    /// Accepts and discards an activity record.
    pub fn record(&self, user_id: Uuid) -> CacheResult<()> {
        tracing::trace!(%user_id, "last-seen tracking disabled, record dropped");
        Ok(())
    }

    /// Always returns the Unix epoch.
    pub fn last_seen(&self, _user_id: Uuid) -> CacheResult<OffsetDateTime> {
        Ok(OffsetDateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_read_is_inert() {
        let store = LastSeenStore::new();
        let user = Uuid::new_v4();

        assert_eq!(store.last_seen(user).unwrap(), OffsetDateTime::UNIX_EPOCH);
        store.record(user).unwrap();
        assert_eq!(store.last_seen(user).unwrap().unix_timestamp(), 0);
    }
}
