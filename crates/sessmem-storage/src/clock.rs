//! Time source shared by the stores and the session components.
//!
//! TTL expiry, the blacklist freeze window and code expiry all read "now"
//! through a [`Clock`], so tests can move time forward without sleeping.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use time::OffsetDateTime;

/// A source of the current UTC instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant.
    fn now(&self) -> OffsetDateTime;
}

/// Shareable clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Returns a shared handle to the system clock.
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock that only moves when told to.
///
/// Cloning shares the underlying instant, so a test can keep one handle and
/// hand another to the store.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Creates a clock frozen at the current wall-clock second.
    #[must_use]
    pub fn starting_now() -> Self {
        let now = OffsetDateTime::now_utc();
        Self::new(now.replace_nanosecond(0).unwrap_or(now))
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Sets the clock to an absolute instant.
    pub fn set(&self, to: OffsetDateTime) {
        *self.now.lock() = to;
    }

    /// Returns a shared handle to this clock.
    #[must_use]
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_manual_clock_advances_all_handles() {
        let clock = ManualClock::new(datetime!(2024-01-01 00:00:00 UTC));
        let shared = clock.shared();

        clock.advance(Duration::from_secs(15));

        assert_eq!(shared.now(), datetime!(2024-01-01 00:00:15 UTC));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::starting_now();
        clock.set(datetime!(2030-06-01 12:00:00 UTC));
        assert_eq!(clock.now(), datetime!(2030-06-01 12:00:00 UTC));
    }
}
