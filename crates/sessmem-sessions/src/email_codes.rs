//! Single-use, rate-limited, expiring email verification codes.
//!
//! Each user has exactly one slot. The lifecycle is:
//!
//! 1. `issue` writes a fresh code into the slot, unless the previous code was
//!    issued less than one cool-down ago
//! 2. `verify` with the right email and code before expiry empties the slot
//! 3. `verify` with anything else leaves the slot as it was, so the user can
//!    retry until the code expires or a new one is issued
//!
//! # Security
//!
//! - Codes are drawn from the thread-local CSPRNG (OS-seeded)
//! - Codes are returned to the caller only; the slot is the sole copy
//! - The rate-limit check and the write happen in one store transaction, so
//!   two concurrent issuances cannot both slip past the cool-down
//!
//! # Storage
//!
//! - Key: `emailCodes:{user_id:16}`
//! - Value: JSON [`EmailCodeData`]
//! - TTL: the code lifetime plus one cool-down, so an expired code is still
//!   present to be reported as a failed verification before it is reclaimed

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sessmem_storage::{KvStore, Namespace, checked_offset};
use uuid::Uuid;

use crate::error::{CacheError, CacheResult};
use crate::types::EmailCodeData;

/// Issues and verifies email verification codes.
#[derive(Debug)]
pub struct EmailCodeIssuer<S> {
    store: Arc<S>,
    lifetime: Duration,
    cooldown: Duration,
    code_length: usize,
}

impl<S: KvStore> EmailCodeIssuer<S> {
    /// Creates an issuer over `store`.
    pub fn new(store: Arc<S>, lifetime: Duration, cooldown: Duration, code_length: usize) -> Self {
        Self {
            store,
            lifetime,
            cooldown,
            code_length,
        }
    }

    /// Issues a new code for `user_id`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// - `RateLimited` if the current code was issued less than one cool-down
    ///   ago; nothing is written in that case
    /// - `InvalidRequest` if `email` is blank
    pub fn issue(&self, user_id: Uuid, email: &str) -> CacheResult<EmailCodeData> {
        if email.trim().is_empty() {
            return Err(CacheError::invalid_request("email must not be empty"));
        }
        let key = Namespace::EmailCodes.user_key(user_id);
        let code = generate_code(self.code_length);

        let data = self.store.transact(|tx| {
            let now = tx.now();
            if let Some(raw) = tx.get(&key)? {
                let previous: EmailCodeData = serde_json::from_slice(&raw)?;
                if now < checked_offset(previous.created_at, self.cooldown)? {
                    return Err(CacheError::RateLimited);
                }
            }

            let data = EmailCodeData {
                new_email: email.to_owned(),
                code,
                created_at: now,
                expires_at: checked_offset(now, self.lifetime)?,
            };
            let retention = self.lifetime.saturating_add(self.cooldown);
            tx.put(&key, &serde_json::to_vec(&data)?, Some(retention))?;
            Ok(data)
        });

        match &data {
            Ok(_) => tracing::debug!(%user_id, "email code issued"),
            Err(CacheError::RateLimited) => {
                tracing::debug!(%user_id, "email code rejected by rate limit");
            }
            Err(_) => {}
        }
        data
    }

    /// Verifies and consumes the pending code for `user_id`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no code is stored (never issued, consumed, or expired
    ///   long enough ago to have been reclaimed)
    /// - `VerificationFailed` if email or code differ, or the code expired;
    ///   the stored code is left in place
    pub fn verify(&self, user_id: Uuid, email: &str, code: &str) -> CacheResult<()> {
        let key = Namespace::EmailCodes.user_key(user_id);
        self.store.transact(|tx| {
            let Some(raw) = tx.get(&key)? else {
                return Err(CacheError::NotFound);
            };
            let data: EmailCodeData = serde_json::from_slice(&raw)?;
            if !data.matches(email, code) || data.is_expired_at(tx.now()) {
                return Err(CacheError::VerificationFailed);
            }
            tx.delete(&key)?;
            Ok(())
        })?;
        tracing::debug!(%user_id, "email code verified");
        Ok(())
    }

    /// Returns the pending code for `user_id`, if any. Expired codes are not
    /// pending.
    pub fn pending(&self, user_id: Uuid) -> CacheResult<Option<EmailCodeData>> {
        let key = Namespace::EmailCodes.user_key(user_id);
        self.store.transact(|tx| {
            let Some(raw) = tx.get(&key)? else {
                return Ok(None);
            };
            let data: EmailCodeData = serde_json::from_slice(&raw)?;
            Ok((!data.is_expired_at(tx.now())).then_some(data))
        })
    }
}

/// Generates a code of `length` uniformly random decimal digits.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
