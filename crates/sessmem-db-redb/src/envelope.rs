//! Expiry envelope stored in front of every value.
//!
//! Layout: `{expires_at_unix_nanos:16BE}{payload:var}`. An expiry of `0`
//! means the entry never expires.

use sessmem_storage::{StorageError, StorageResult};
use time::OffsetDateTime;

/// Size of the expiry header in bytes.
pub const HEADER_LEN: usize = 16;

/// Wraps `payload` with its expiry.
pub fn encode(payload: &[u8], expires_at: Option<OffsetDateTime>) -> Vec<u8> {
    let nanos = expires_at.map_or(0, OffsetDateTime::unix_timestamp_nanos);
    let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
    buf.extend_from_slice(&nanos.to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Splits a stored value into its expiry and payload.
pub fn decode(raw: &[u8]) -> StorageResult<(Option<OffsetDateTime>, &[u8])> {
    if raw.len() < HEADER_LEN {
        return Err(StorageError::corrupted(format!(
            "value is {} bytes, shorter than the {HEADER_LEN}-byte expiry header",
            raw.len()
        )));
    }
    let (header, payload) = raw.split_at(HEADER_LEN);
    let header: [u8; HEADER_LEN] = header
        .try_into()
        .map_err(|_| StorageError::corrupted("expiry header"))?;
    let nanos = i128::from_be_bytes(header);
    if nanos == 0 {
        return Ok((None, payload));
    }
    let expires_at = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| StorageError::corrupted(format!("expiry out of range: {e}")))?;
    Ok((Some(expires_at), payload))
}

/// Returns `true` if the stored value has not expired at `now`.
pub fn is_live(raw: &[u8], now: OffsetDateTime) -> StorageResult<bool> {
    let (expires_at, _) = decode(raw)?;
    Ok(expires_at.is_none_or(|at| now < at))
}

/// Returns the payload if the stored value is live at `now`.
pub fn live_payload(raw: &[u8], now: OffsetDateTime) -> StorageResult<Option<Vec<u8>>> {
    let (expires_at, payload) = decode(raw)?;
    if expires_at.is_none_or(|at| now < at) {
        Ok(Some(payload.to_vec()))
    } else {
        Ok(None)
    }
}
