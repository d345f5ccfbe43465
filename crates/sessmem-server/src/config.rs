use serde::{Deserialize, Serialize};
use sessmem_sessions::SessionSettings;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Blacklist and email code tunables
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        // Storage validations
        if self.storage.path.as_os_str().is_empty() {
            return Err("storage.path must not be empty".into());
        }
        if self.storage.purge_interval.is_zero() {
            return Err("storage.purge_interval must be > 0".into());
        }
        // Session validations
        self.sessions.validate()?;
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.server.listen_addr
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_body_limit() -> usize {
    16 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// redb database file. Only one process may hold it open.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// How often expired entries are physically removed
    #[serde(default = "default_purge_interval", with = "humantime_serde")]
    pub purge_interval: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            purge_interval: default_purge_interval(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("sessmem.redb")
}

fn default_purge_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File, FileFormat};
    use std::path::PathBuf;

    /// Default configuration file, looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "sessmem.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        load_config_with_overrides(path, &[])
    }

    /// Loads configuration from defaults, the TOML file, `SESSMEM__*`
    /// environment variables and finally `overrides` (dotted keys, e.g.
    /// `storage.path`), each layer winning over the previous one.
    pub fn load_config_with_overrides(
        path: Option<&str>,
        overrides: &[(&str, String)],
    ) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf).format(FileFormat::Toml));
        } else if path.is_some() {
            tracing::warn!(path = %pathbuf.display(), "Configuration file not found, using defaults");
        }
        // Environment variable overrides, e.g., SESSMEM__SERVER__LISTEN_ADDR=127.0.0.1:9090
        builder = builder.add_source(
            Environment::with_prefix("SESSMEM")
                .try_parsing(true)
                .separator("__"),
        );
        for (key, value) in overrides {
            builder = builder
                .set_override(*key, value.as_str())
                .map_err(|e| format!("config override {key} error: {e}"))?;
        }
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        // Validate
        merged.validate()?;
        Ok(merged)
    }
}
