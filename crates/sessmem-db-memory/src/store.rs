use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use sessmem_storage::{
    KvStore, KvTransaction, SharedClock, StorageError, StorageResult, expires_at,
};
use time::OffsetDateTime;

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<OffsetDateTime>,
}

impl Entry {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory key-value store.
///
/// This storage implementation provides:
/// - TTL expiry evaluated against the injected clock
/// - Serializable transactions (one mutex held for the whole transaction)
/// - Staged writes that are discarded when the transaction fails
#[derive(Debug)]
pub struct InMemoryStore {
    data: Mutex<BTreeMap<Vec<u8>, Entry>>,
    clock: SharedClock,
}

impl InMemoryStore {
    /// Creates an empty store reading time from `clock`.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            data: Mutex::new(BTreeMap::new()),
            clock,
        }
    }

    /// Number of live (unexpired) entries.
    pub fn live_len(&self) -> usize {
        let now = self.clock.now();
        self.data.lock().values().filter(|e| e.is_live(now)).count()
    }

    /// Number of physically retained entries, expired ones included.
    pub fn raw_len(&self) -> usize {
        self.data.lock().len()
    }
}

impl KvStore for InMemoryStore {
    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvTransaction) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut data = self.data.lock();
        let mut tx = MemoryTransaction {
            committed: &*data,
            staged: BTreeMap::new(),
            now: self.clock.now(),
        };

        let out = f(&mut tx)?;

        let MemoryTransaction { staged, .. } = tx;
        for (key, write) in staged {
            match write {
                Some(entry) => {
                    data.insert(key, entry);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Ok(out)
    }

    fn purge_expired(&self) -> StorageResult<usize> {
        let now = self.clock.now();
        let mut data = self.data.lock();
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        let removed = before - data.len();
        if removed > 0 {
            tracing::debug!(removed, "purged expired in-memory entries");
        }
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// A transaction over the locked map. `None` in `staged` marks a delete.
struct MemoryTransaction<'a> {
    committed: &'a BTreeMap<Vec<u8>, Entry>,
    staged: BTreeMap<Vec<u8>, Option<Entry>>,
    now: OffsetDateTime,
}

impl MemoryTransaction<'_> {
    fn live(&self, key: &[u8]) -> Option<&Entry> {
        let entry = match self.staged.get(key) {
            Some(staged) => staged.as_ref(),
            None => self.committed.get(key),
        };
        entry.filter(|e| e.is_live(self.now))
    }
}

impl KvTransaction for MemoryTransaction<'_> {
    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.live(key).map(|e| e.value.clone()))
    }

    fn put(&mut self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: expires_at(self.now, ttl)?,
        };
        self.staged.insert(key.to_vec(), Some(entry));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<bool> {
        let existed = self.live(key).is_some();
        self.staged.insert(key.to_vec(), None);
        Ok(existed)
    }

    fn now(&self) -> OffsetDateTime {
        self.now
    }
}
