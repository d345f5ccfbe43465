//! # sessmem-sessions
//!
//! The domain components of the session cache, written against the
//! [`KvStore`] port:
//!
//! - [`SessionBlacklist`] - revoked token signatures, enforced after a freeze
//!   window
//! - [`LastSeenStore`] - per-user activity timestamps (currently inert)
//! - [`EmailCodeIssuer`] - single-use, rate-limited email verification codes
//!
//! All time-dependent decisions read "now" from the store transaction, which
//! in turn reads the clock injected into the store.

pub mod blacklist;
pub mod email_codes;
pub mod error;
pub mod last_seen;
pub mod settings;
pub mod types;

use std::sync::Arc;

use sessmem_storage::KvStore;

pub use blacklist::SessionBlacklist;
pub use email_codes::{EmailCodeIssuer, generate_code};
pub use error::{CacheError, CacheResult};
pub use last_seen::LastSeenStore;
pub use settings::SessionSettings;
pub use types::{EmailCodeData, VerifyCodeRequest};

/// The three components wired to one shared store.
#[derive(Debug)]
pub struct SessionServices<S> {
    pub blacklist: SessionBlacklist<S>,
    pub last_seen: LastSeenStore,
    pub email_codes: EmailCodeIssuer<S>,
}

impl<S: KvStore> SessionServices<S> {
    pub fn new(store: Arc<S>, settings: &SessionSettings) -> Self {
        Self {
            blacklist: SessionBlacklist::new(
                Arc::clone(&store),
                settings.freeze_window,
                settings.blacklist_retention,
            ),
            last_seen: LastSeenStore::new(),
            email_codes: EmailCodeIssuer::new(
                store,
                settings.code_lifetime,
                settings.code_cooldown,
                settings.code_length,
            ),
        }
    }
}
