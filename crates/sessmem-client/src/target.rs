use std::path::PathBuf;
use std::sync::Arc;

use sessmem_sessions::{CacheResult, SessionSettings};

use crate::{EmbeddedCache, RemoteCache, SessionCache};

/// Where the session cache lives.
#[derive(Debug, Clone)]
pub enum CacheTarget {
    /// Open the store file in this process.
    Embedded {
        path: PathBuf,
        settings: SessionSettings,
    },
    /// Talk to the process that owns the store.
    Remote { base_url: String },
}

/// Selects the access path once and returns it behind the common interface.
///
/// # Errors
///
/// Embedded: the store cannot be opened or the settings are invalid.
/// Remote: the base URL is malformed. No connection is attempted here.
pub fn connect(target: CacheTarget) -> CacheResult<Arc<dyn SessionCache>> {
    match target {
        CacheTarget::Embedded { path, settings } => {
            let cache = EmbeddedCache::open(&path, &settings)?;
            tracing::info!(path = %path.display(), "Session cache opened in embedded mode");
            Ok(Arc::new(cache))
        }
        CacheTarget::Remote { base_url } => {
            let cache = RemoteCache::new(&base_url)?;
            tracing::info!(base_url = %cache.base_url(), "Session cache using remote mode");
            Ok(Arc::new(cache))
        }
    }
}
