use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sessmem_db_redb::RedbStore;
use sessmem_sessions::{
    CacheError, CacheResult, EmailCodeData, SessionServices, SessionSettings,
};
use sessmem_storage::{KvStore, SharedClock, SystemClock};
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{CacheMode, SessionCache};

/// In-process access: owns the store and runs the session components
/// directly.
///
/// Store calls are blocking, so every operation is moved onto tokio's
/// blocking pool.
#[derive(Debug)]
pub struct EmbeddedCache<S = RedbStore> {
    store: Arc<S>,
    services: Arc<SessionServices<S>>,
}

impl EmbeddedCache<RedbStore> {
    /// Opens (or creates) the redb file at `path`.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for inconsistent settings, `Storage` if the file
    /// cannot be opened or is locked by another process.
    pub fn open(path: impl AsRef<Path>, settings: &SessionSettings) -> CacheResult<Self> {
        Self::open_with_clock(path, settings, SystemClock::shared())
    }

    /// Like [`open`](Self::open), reading time from `clock`.
    pub fn open_with_clock(
        path: impl AsRef<Path>,
        settings: &SessionSettings,
        clock: SharedClock,
    ) -> CacheResult<Self> {
        settings.validate().map_err(CacheError::invalid_request)?;
        let store = RedbStore::open(path, clock)?;
        Ok(Self::assemble(Arc::new(store), settings))
    }
}

impl<S: KvStore + 'static> EmbeddedCache<S> {
    /// Wraps an already opened store.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for inconsistent settings.
    pub fn with_store(store: Arc<S>, settings: &SessionSettings) -> CacheResult<Self> {
        settings.validate().map_err(CacheError::invalid_request)?;
        Ok(Self::assemble(store, settings))
    }

    fn assemble(store: Arc<S>, settings: &SessionSettings) -> Self {
        let services = Arc::new(SessionServices::new(Arc::clone(&store), settings));
        Self { store, services }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Physically removes expired entries now.
    pub async fn purge_expired(&self) -> CacheResult<usize> {
        let store = Arc::clone(&self.store);
        let purged = tokio::task::spawn_blocking(move || store.purge_expired())
            .await
            .map_err(|e| CacheError::internal(format!("purge task failed: {e}")))??;
        Ok(purged)
    }

    /// Starts a background task that purges expired entries every
    /// `interval`. The first run happens one interval after the call.
    ///
    /// Failures are logged and the task keeps going. Abort the returned
    /// handle to stop it.
    pub fn spawn_expiry_collector(&self, interval: Duration) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let store = Arc::clone(&store);
                let backend = store.backend_name();
                match tokio::task::spawn_blocking(move || store.purge_expired()).await {
                    Ok(Ok(0)) => debug!(backend, "Expiry collector found nothing to purge"),
                    Ok(Ok(purged)) => info!(backend, purged, "Expiry collector purged entries"),
                    Ok(Err(e)) => warn!(backend, error = %e, "Expiry collector cycle failed"),
                    Err(e) => warn!(backend, error = %e, "Expiry collector task panicked"),
                }
            }
        })
    }

    async fn run<T, F>(&self, f: F) -> CacheResult<T>
    where
        F: FnOnce(&SessionServices<S>) -> CacheResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let services = Arc::clone(&self.services);
        tokio::task::spawn_blocking(move || f(&services))
            .await
            .map_err(|e| CacheError::internal(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl<S: KvStore + std::fmt::Debug + 'static> SessionCache for EmbeddedCache<S> {
    async fn blacklist(&self, signature: &[u8]) -> CacheResult<()> {
        let signature = signature.to_vec();
        self.run(move |s| s.blacklist.revoke(&signature)).await
    }

    async fn is_blacklisted(&self, signature: &[u8]) -> CacheResult<bool> {
        let signature = signature.to_vec();
        self.run(move |s| s.blacklist.is_blacklisted(&signature))
            .await
    }

    async fn save_last_seen(&self, user_id: Uuid) -> CacheResult<()> {
        self.services.last_seen.record(user_id)
    }

    async fn get_last_seen(&self, user_id: Uuid) -> CacheResult<OffsetDateTime> {
        self.services.last_seen.last_seen(user_id)
    }

    async fn issue_code(&self, user_id: Uuid, email: &str) -> CacheResult<EmailCodeData> {
        let email = email.to_owned();
        self.run(move |s| s.email_codes.issue(user_id, &email)).await
    }

    async fn verify_code(&self, user_id: Uuid, email: &str, code: &str) -> CacheResult<()> {
        let email = email.to_owned();
        let code = code.to_owned();
        self.run(move |s| s.email_codes.verify(user_id, &email, &code))
            .await
    }

    async fn pending_code(&self, user_id: Uuid) -> CacheResult<Option<EmailCodeData>> {
        self.run(move |s| s.email_codes.pending(user_id)).await
    }

    fn mode(&self) -> CacheMode {
        CacheMode::Embedded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sessmem_db_memory::InMemoryStore;
    use sessmem_storage::ManualClock;
    use time::macros::datetime;

    fn cache() -> (EmbeddedCache<InMemoryStore>, ManualClock) {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let store = Arc::new(InMemoryStore::new(clock.shared()));
        (
            EmbeddedCache::with_store(store, &SessionSettings::default()).unwrap(),
            clock,
        )
    }

    #[tokio::test]
    async fn test_blacklist_through_facade() {
        let (cache, clock) = cache();
        assert_eq!(cache.mode(), CacheMode::Embedded);

        cache.blacklist(b"sig").await.unwrap();
        assert!(!cache.is_blacklisted(b"sig").await.unwrap());

        clock.advance(Duration::from_secs(15));
        assert!(cache.is_blacklisted(b"sig").await.unwrap());
    }

    #[tokio::test]
    async fn test_email_code_through_facade() {
        let (cache, _) = cache();
        let user = Uuid::new_v4();

        let data = cache.issue_code(user, "a@b.com").await.unwrap();
        assert_eq!(
            cache.issue_code(user, "a@b.com").await.unwrap_err(),
            CacheError::RateLimited
        );
        assert_eq!(cache.pending_code(user).await.unwrap(), Some(data.clone()));

        cache.verify_code(user, "a@b.com", &data.code).await.unwrap();
        assert_eq!(
            cache
                .verify_code(user, "a@b.com", &data.code)
                .await
                .unwrap_err(),
            CacheError::NotFound
        );
    }

    #[tokio::test]
    async fn test_last_seen_is_epoch() {
        let (cache, _) = cache();
        let user = Uuid::new_v4();
        cache.save_last_seen(user).await.unwrap();
        assert_eq!(
            cache.get_last_seen(user).await.unwrap(),
            OffsetDateTime::UNIX_EPOCH
        );
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (cache, clock) = cache();
        cache.issue_code(Uuid::new_v4(), "a@b.com").await.unwrap();
        assert_eq!(cache.purge_expired().await.unwrap(), 0);

        // Expired codes are kept for one more cool-down
        clock.advance(Duration::from_secs(300));
        assert_eq!(cache.purge_expired().await.unwrap(), 0);

        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.store().raw_len(), 0);
    }

    #[tokio::test]
    async fn test_expiry_collector_runs_in_background() {
        let (cache, clock) = cache();
        cache.issue_code(Uuid::new_v4(), "a@b.com").await.unwrap();
        clock.advance(Duration::from_secs(360));

        let handle = cache.spawn_expiry_collector(Duration::from_millis(10));
        for _ in 0..100 {
            if cache.store().raw_len() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert_eq!(cache.store().raw_len(), 0);
    }

    #[test]
    fn test_with_store_validates_settings() {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let store = Arc::new(InMemoryStore::new(clock.shared()));
        let settings = SessionSettings {
            code_lifetime: Duration::ZERO,
            ..Default::default()
        };

        let err = EmbeddedCache::with_store(store, &settings).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }
}
