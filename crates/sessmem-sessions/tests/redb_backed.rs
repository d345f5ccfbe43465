//! Session components running on the embedded redb engine.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use sessmem_db_redb::RedbStore;
use sessmem_sessions::{CacheError, SessionServices, SessionSettings};
use sessmem_storage::{KvStore, ManualClock};
use time::macros::datetime;
use uuid::Uuid;

fn services(dir: &tempfile::TempDir) -> (SessionServices<RedbStore>, Arc<RedbStore>, ManualClock) {
    let clock = ManualClock::new(datetime!(2024-06-01 12:00:00 UTC));
    let store = Arc::new(RedbStore::open(dir.path().join("cache.redb"), clock.shared()).unwrap());
    let services = SessionServices::new(Arc::clone(&store), &SessionSettings::default());
    (services, store, clock)
}

#[test]
fn blacklist_freeze_holds_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (services, _, clock) = services(&dir);

    services.blacklist.revoke(b"sig-1").unwrap();
    assert!(!services.blacklist.is_blacklisted(b"sig-1").unwrap());

    clock.advance(Duration::from_secs(15));
    assert!(services.blacklist.is_blacklisted(b"sig-1").unwrap());
}

#[test]
fn email_code_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let (services, _, clock) = services(&dir);
    let user = Uuid::new_v4();

    let data = services.email_codes.issue(user, "new@example.com").unwrap();
    assert_eq!(
        services.email_codes.issue(user, "new@example.com").unwrap_err(),
        CacheError::RateLimited
    );
    assert_eq!(
        services.email_codes.pending(user).unwrap().as_ref(),
        Some(&data)
    );

    assert_eq!(
        services
            .email_codes
            .verify(user, "other@example.com", &data.code)
            .unwrap_err(),
        CacheError::VerificationFailed
    );

    clock.advance(Duration::from_secs(30));
    services
        .email_codes
        .verify(user, "new@example.com", &data.code)
        .unwrap();
    assert_eq!(services.email_codes.pending(user).unwrap(), None);
}

#[test]
fn expired_code_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    let (services, _, clock) = services(&dir);
    let user = Uuid::new_v4();

    let data = services.email_codes.issue(user, "a@b.com").unwrap();
    clock.advance(Duration::from_secs(5 * 60));

    assert_eq!(
        services
            .email_codes
            .verify(user, "a@b.com", &data.code)
            .unwrap_err(),
        CacheError::VerificationFailed
    );
    assert_eq!(services.email_codes.pending(user).unwrap(), None);
}

#[test]
fn concurrent_issuance_admits_exactly_one() {
    const THREADS: usize = 16;

    let dir = tempfile::tempdir().unwrap();
    let (services, _, _) = services(&dir);
    let services = Arc::new(services);
    let user = Uuid::new_v4();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let services = Arc::clone(&services);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                services.email_codes.issue(user, "a@b.com")
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let issued: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(issued.len(), 1);
    assert_eq!(
        results.iter().filter(|r| **r == Err(CacheError::RateLimited)).count(),
        THREADS - 1
    );
    assert_eq!(services.email_codes.pending(user).unwrap().as_ref(), Some(issued[0]));
}

#[test]
fn purge_reclaims_expired_codes() {
    let dir = tempfile::tempdir().unwrap();
    let (services, store, clock) = services(&dir);

    for _ in 0..3 {
        services
            .email_codes
            .issue(Uuid::new_v4(), "a@example.com")
            .unwrap();
    }
    services.blacklist.revoke(b"sig").unwrap();

    // Expired codes stay one cool-down past their lifetime
    clock.advance(Duration::from_secs(5 * 60));
    assert_eq!(store.purge_expired().unwrap(), 0);

    clock.advance(Duration::from_secs(60));
    assert_eq!(store.purge_expired().unwrap(), 3);
    assert!(services.blacklist.is_blacklisted(b"sig").unwrap());
}

#[test]
fn last_seen_is_inert() {
    let dir = tempfile::tempdir().unwrap();
    let (services, _, _) = services(&dir);
    let user = Uuid::new_v4();

    services.last_seen.record(user).unwrap();
    assert_eq!(
        services.last_seen.last_seen(user).unwrap().unix_timestamp(),
        0
    );
}
