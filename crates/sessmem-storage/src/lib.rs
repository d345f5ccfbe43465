//! # sessmem-storage
//!
//! Storage abstraction layer for sessmem.
//!
//! This crate defines the narrow key-value port that the session components
//! are written against. It does not contain any engine - those are provided by
//! separate crates (`sessmem-db-redb`, `sessmem-db-memory`).
//!
//! ## Overview
//!
//! The main trait is [`KvStore`], which defines the contract for:
//! - single-key reads, writes (with optional TTL) and deletes
//! - atomic read-then-write transactions via [`KvStore::transact`]
//! - physical removal of expired entries
//!
//! All logical collections share one physical store and are kept apart by
//! the key prefixes in [`Namespace`].
//!
//! ## Example
//!
//! ```ignore
//! use sessmem_storage::{KvStore, Namespace, StorageError};
//!
//! fn take_once<S: KvStore>(store: &S, id: &[u8]) -> Result<bool, StorageError> {
//!     let key = Namespace::EmailCodes.key(id);
//!     store.transact(|tx| {
//!         if tx.get(&key)?.is_none() {
//!             return Ok(false);
//!         }
//!         tx.delete(&key)?;
//!         Ok(true)
//!     })
//! }
//! ```

mod clock;
mod error;
mod namespace;
mod traits;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use error::StorageError;
pub use namespace::Namespace;
pub use traits::{KvStore, KvTransaction, checked_offset, expires_at};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sessmem_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SharedClock, SystemClock};
    pub use crate::error::StorageError;
    pub use crate::namespace::Namespace;
    pub use crate::traits::{KvStore, KvTransaction};
    pub use crate::StorageResult;
}
