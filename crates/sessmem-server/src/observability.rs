//! Log output for the server binary.
//!
//! The filter sits behind a reload layer: the process starts logging at
//! `info` before the configuration is read, then switches to the configured
//! `logging.level`. `RUST_LOG`, when set and parseable, pins the filter for
//! the whole run.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing_with_level(level: &str) {
    let filter = env_filter().unwrap_or_else(|| EnvFilter::new(level));
    let (layer, handle) = reload::Layer::new(filter);
    let _ = FILTER.set(handle);

    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(fmt::layer())
        .try_init();
}

/// Swaps in `level` once configuration is loaded, unless `RUST_LOG` is set.
pub fn apply_logging_level(level: &str) {
    if env_filter().is_some() {
        return;
    }
    if let Some(handle) = FILTER.get() {
        let _ = handle.modify(|filter| *filter = EnvFilter::new(level));
    }
}

fn env_filter() -> Option<EnvFilter> {
    std::env::var_os("RUST_LOG")?;
    EnvFilter::try_from_default_env().ok()
}
