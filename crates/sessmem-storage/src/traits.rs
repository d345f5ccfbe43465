//! Storage traits for the key-value port.
//!
//! This module defines the contract every storage engine must implement.

use std::time::Duration;

use time::OffsetDateTime;

use crate::StorageResult;
use crate::error::StorageError;

/// The storage port that the session components are written against.
///
/// Implementations must be thread-safe (`Send + Sync`) and must give
/// [`transact`](KvStore::transact) serializable isolation: two concurrent
/// transactions touching the same key behave as if one ran entirely before
/// the other.
///
/// # Expiry
///
/// A key written with a TTL becomes invisible once the store clock reaches
/// its expiry. Reads of an expired key return `None` and deletes return
/// `false`, exactly as for a key that was never written. Physical removal is
/// left to [`purge_expired`](KvStore::purge_expired).
///
/// # Example
///
/// ```ignore
/// use sessmem_storage::{KvStore, StorageError};
///
/// fn put_if_absent<S: KvStore>(store: &S, key: &[u8], value: &[u8]) -> Result<bool, StorageError> {
///     store.transact(|tx| {
///         if tx.get(key)?.is_some() {
///             return Ok(false);
///         }
///         tx.put(key, value, None)?;
///         Ok(true)
///     })
/// }
/// ```
pub trait KvStore: Send + Sync {
    // ==================== Single-key Operations ====================

    /// Reads a live value.
    ///
    /// # Errors
    ///
    /// Returns an error only for engine failures, not for missing keys.
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.transact(|tx| tx.get(key))
    }

    /// Writes a value, replacing any previous one.
    ///
    /// With `ttl = Some(d)` the entry expires `d` after the store's current
    /// instant; with `None` it never expires.
    fn put(&self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        self.transact(|tx| tx.put(key, value, ttl))
    }

    /// Deletes a key.
    ///
    /// Returns `true` if a live entry was removed.
    fn delete(&self, key: &[u8]) -> StorageResult<bool> {
        self.transact(|tx| tx.delete(key))
    }

    // ==================== Transactions ====================

    /// Runs `f` as one atomic transaction.
    ///
    /// If `f` returns `Ok`, its writes are committed; if it returns `Err`,
    /// none of them are applied and the error is passed through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a `StorageError` (converted into `E`)
    /// if the engine fails to begin or commit.
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvTransaction) -> Result<T, E>,
        E: From<StorageError>;

    // ==================== Maintenance ====================

    /// Physically removes expired entries.
    ///
    /// Returns the number of entries removed.
    fn purge_expired(&self) -> StorageResult<usize>;

    /// Returns the name of this engine for logging.
    fn backend_name(&self) -> &'static str;
}

/// Operations available inside [`KvStore::transact`].
///
/// Reads observe the transaction's own earlier writes.
pub trait KvTransaction {
    /// Reads a live value.
    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Writes a value with an optional TTL.
    fn put(&mut self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StorageResult<()>;

    /// Deletes a key. Returns `true` if a live entry was removed.
    fn delete(&mut self, key: &[u8]) -> StorageResult<bool>;

    /// The instant this transaction treats as "now".
    fn now(&self) -> OffsetDateTime;
}

/// Adds `by` to `at`, failing with `OutOfRange` instead of overflowing.
pub fn checked_offset(at: OffsetDateTime, by: Duration) -> StorageResult<OffsetDateTime> {
    time::Duration::try_from(by)
        .ok()
        .and_then(|by| at.checked_add(by))
        .ok_or_else(|| StorageError::out_of_range(format!("{at} + {by:?}")))
}

/// Computes the absolute expiry for a write made at `now`.
pub fn expires_at(
    now: OffsetDateTime,
    ttl: Option<Duration>,
) -> StorageResult<Option<OffsetDateTime>> {
    ttl.map(|ttl| checked_offset(now, ttl)).transpose()
}
