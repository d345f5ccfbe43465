use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use redb::{Database, ReadableTable, Table, TableDefinition};
use sessmem_storage::{
    KvStore, KvTransaction, SharedClock, StorageError, StorageResult, expires_at,
};
use time::OffsetDateTime;

use crate::envelope;

/// The single table holding every namespace.
/// Key format: `{namespace}:{id:var}`; value format: see [`envelope`].
const KV: TableDefinition<'static, &'static [u8], &'static [u8]> = TableDefinition::new("kv");

/// redb-backed key-value store.
pub struct RedbStore {
    db: Database,
    path: PathBuf,
    clock: SharedClock,
}

impl fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Opens the database at `path`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be created or read, is not a redb database,
    /// or is already open elsewhere.
    pub fn open(path: impl AsRef<Path>, clock: SharedClock) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Database::create(&path).map_err(StorageError::backend)?;

        // Create the table up front so read transactions never see it missing.
        let txn = db.begin_write().map_err(StorageError::backend)?;
        txn.open_table(KV).map_err(StorageError::backend)?;
        txn.commit().map_err(StorageError::backend)?;

        tracing::info!(path = %path.display(), "opened redb store");
        Ok(Self { db, path, clock })
    }

    /// Filesystem location of the database.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvStore for RedbStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let txn = self.db.begin_read().map_err(StorageError::backend)?;
        let table = txn.open_table(KV).map_err(StorageError::backend)?;
        let value = match table.get(key).map_err(StorageError::backend)? {
            Some(raw) => envelope::live_payload(raw.value(), self.clock.now())?,
            None => None,
        };
        Ok(value)
    }

    fn transact<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvTransaction) -> Result<T, E>,
        E: From<StorageError>,
    {
        let txn = self.db.begin_write().map_err(StorageError::backend)?;
        let result = {
            let table = txn.open_table(KV).map_err(StorageError::backend)?;
            let mut tx = RedbTransaction {
                table,
                now: self.clock.now(),
            };
            f(&mut tx)
        };

        match result {
            Ok(out) => {
                txn.commit().map_err(StorageError::backend)?;
                Ok(out)
            }
            Err(err) => {
                if let Err(abort_err) = txn.abort() {
                    tracing::warn!(error = %abort_err, "failed to abort redb transaction");
                }
                Err(err)
            }
        }
    }

    fn purge_expired(&self) -> StorageResult<usize> {
        let now = self.clock.now();
        let txn = self.db.begin_write().map_err(StorageError::backend)?;
        let removed = {
            let mut table = txn.open_table(KV).map_err(StorageError::backend)?;

            let mut expired = Vec::new();
            for item in table.iter().map_err(StorageError::backend)? {
                let (key, value) = item.map_err(StorageError::backend)?;
                match envelope::is_live(value.value(), now) {
                    Ok(true) => {}
                    Ok(false) => expired.push(key.value().to_vec()),
                    Err(e) => {
                        tracing::warn!(error = %e, "skipping unreadable entry during purge");
                    }
                }
            }

            for key in &expired {
                table
                    .remove(key.as_slice())
                    .map_err(StorageError::backend)?;
            }
            expired.len()
        };

        if removed > 0 {
            txn.commit().map_err(StorageError::backend)?;
            tracing::debug!(removed, "purged expired redb entries");
        } else {
            txn.abort().map_err(StorageError::backend)?;
        }
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "redb"
    }
}

/// A write transaction with the `kv` table open.
struct RedbTransaction<'txn> {
    table: Table<'txn, &'static [u8], &'static [u8]>,
    now: OffsetDateTime,
}

impl KvTransaction for RedbTransaction<'_> {
    fn get(&mut self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        match self.table.get(key).map_err(StorageError::backend)? {
            Some(raw) => envelope::live_payload(raw.value(), self.now),
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &[u8], value: &[u8], ttl: Option<Duration>) -> StorageResult<()> {
        let raw = envelope::encode(value, expires_at(self.now, ttl)?);
        self.table
            .insert(key, raw.as_slice())
            .map_err(StorageError::backend)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StorageResult<bool> {
        let removed = self.table.remove(key).map_err(StorageError::backend)?;
        match removed {
            Some(raw) => envelope::is_live(raw.value(), self.now),
            None => Ok(false),
        }
    }

    fn now(&self) -> OffsetDateTime {
        self.now
    }
}
