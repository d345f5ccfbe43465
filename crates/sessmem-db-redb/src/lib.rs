//! Embedded redb storage backend for sessmem.
//!
//! All logical collections live in a single `kv` table of a single database
//! file; keys carry the [`Namespace`](sessmem_storage::Namespace) prefix and
//! values carry an expiry envelope (see [`envelope`]).
//!
//! The file is exclusively locked while open, so exactly one process can own
//! the store at a time. Other application instances reach it through the
//! remote client.

pub mod envelope;
mod store;

pub use sessmem_storage::{KvStore, KvTransaction, StorageError};
pub use store::RedbStore;
