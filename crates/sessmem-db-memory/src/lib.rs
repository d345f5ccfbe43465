//! In-memory storage backend for sessmem.
//!
//! This crate provides an in-memory implementation of the [`KvStore`] port
//! from `sessmem-storage`. It is used by tests and by deployments that do not
//! need the cache to survive a restart.
//!
//! # Example
//!
//! ```ignore
//! use sessmem_db_memory::InMemoryStore;
//! use sessmem_storage::{KvStore, SystemClock};
//!
//! let store = InMemoryStore::new(SystemClock::shared());
//! store.put(b"blacklist:abc", b"...", None)?;
//! ```

mod store;

pub use sessmem_storage::{KvStore, KvTransaction, StorageError};
pub use store::InMemoryStore;
