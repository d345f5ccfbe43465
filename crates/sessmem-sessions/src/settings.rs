//! Tunables for the session components.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default delay before a revoked signature is enforced.
pub const DEFAULT_FREEZE_WINDOW: Duration = Duration::from_secs(15);

/// Default retention of blacklist entries. Must exceed any token lifetime.
pub const DEFAULT_BLACKLIST_RETENTION: Duration = Duration::from_secs(30 * 24 * 3600);

/// Default validity of an email verification code.
pub const DEFAULT_CODE_LIFETIME: Duration = Duration::from_secs(5 * 60);

/// Default minimum interval between two codes for the same user.
pub const DEFAULT_CODE_COOLDOWN: Duration = Duration::from_secs(60);

/// Default number of digits in a verification code.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Upper bound for the blacklist retention (and so for the freeze window).
pub const MAX_RETENTION: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Upper bound for the code lifetime and cool-down.
pub const MAX_CODE_LIFETIME: Duration = Duration::from_secs(24 * 3600);

/// Session component configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [sessions]
/// freeze_window = "15s"
/// blacklist_retention = "30days"
/// code_lifetime = "5m"
/// code_cooldown = "1m"
/// code_length = 6
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// How long a freshly revoked signature is still reported as not
    /// blacklisted, so requests already in flight can finish.
    #[serde(with = "humantime_serde")]
    pub freeze_window: Duration,

    /// How long blacklist entries are kept.
    #[serde(with = "humantime_serde")]
    pub blacklist_retention: Duration,

    /// How long an issued code can be verified.
    #[serde(with = "humantime_serde")]
    pub code_lifetime: Duration,

    /// Minimum interval between two issuances for the same user.
    #[serde(with = "humantime_serde")]
    pub code_cooldown: Duration,

    /// Number of decimal digits in a code.
    pub code_length: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            freeze_window: DEFAULT_FREEZE_WINDOW,
            blacklist_retention: DEFAULT_BLACKLIST_RETENTION,
            code_lifetime: DEFAULT_CODE_LIFETIME,
            code_cooldown: DEFAULT_CODE_COOLDOWN,
            code_length: DEFAULT_CODE_LENGTH,
        }
    }
}

impl SessionSettings {
    /// Checks the settings for internal consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.blacklist_retention.is_zero() {
            return Err("sessions.blacklist_retention must be > 0".into());
        }
        if self.blacklist_retention > MAX_RETENTION {
            return Err("sessions.blacklist_retention must be at most 10 years".into());
        }
        if self.blacklist_retention <= self.freeze_window {
            return Err("sessions.blacklist_retention must exceed sessions.freeze_window".into());
        }
        if self.code_lifetime.is_zero() {
            return Err("sessions.code_lifetime must be > 0".into());
        }
        if self.code_lifetime > MAX_CODE_LIFETIME {
            return Err("sessions.code_lifetime must be at most 24 hours".into());
        }
        if self.code_cooldown.is_zero() {
            return Err("sessions.code_cooldown must be > 0".into());
        }
        if self.code_cooldown > self.code_lifetime {
            return Err("sessions.code_cooldown must be <= sessions.code_lifetime".into());
        }
        if !(4..=12).contains(&self.code_length) {
            return Err("sessions.code_length must be between 4 and 12".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SessionSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.freeze_window, Duration::from_secs(15));
        assert_eq!(settings.code_length, 6);
    }

    #[test]
    fn test_parse_humantime_toml() {
        let settings: SessionSettings = toml::from_str(
            r#"
            freeze_window = "2s"
            code_lifetime = "10m"
            "#,
        )
        .unwrap();

        assert_eq!(settings.freeze_window, Duration::from_secs(2));
        assert_eq!(settings.code_lifetime, Duration::from_secs(600));
        assert_eq!(settings.code_cooldown, DEFAULT_CODE_COOLDOWN);
    }

    #[test]
    fn test_validate_rejects_inconsistent_values() {
        let settings = SessionSettings {
            code_cooldown: Duration::from_secs(600),
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = SessionSettings {
            code_length: 3,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        // A zero freeze window enforces revocations immediately; that is allowed.
        let settings = SessionSettings {
            freeze_window: Duration::ZERO,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let settings = SessionSettings {
            blacklist_retention: Duration::from_secs(10_000 * 365 * 24 * 3600),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.contains("blacklist_retention must be at most"));

        let settings = SessionSettings {
            code_lifetime: Duration::from_secs(2 * 24 * 3600),
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.contains("code_lifetime must be at most"));

        let settings = SessionSettings {
            blacklist_retention: MAX_RETENTION,
            code_lifetime: MAX_CODE_LIFETIME,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
    }
}
