use std::env;
use std::path::PathBuf;

use clap::Parser;
use sessmem_server::ServerBuilder;
use sessmem_server::config::loader::{DEFAULT_CONFIG_FILE, load_config_with_overrides};

/// Session cache server: token blacklist and email verification codes.
#[derive(Parser, Debug)]
#[command(name = "sessmem-server")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// redb database file (overrides storage.path)
    #[arg(long, value_name = "PATH")]
    store_path: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:8080 (overrides server.listen_addr)
    #[arg(long, value_name = "ADDR")]
    listen_addr: Option<String>,
}

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From SESSMEM_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (sessmem.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (SESSMEM_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist - it's optional
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound) {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    let cli = Cli::parse();

    // Initialize tracing early with the default level
    sessmem_server::observability::init_tracing();

    let (config_path, source) = resolve_config_path(cli.config.clone());

    let mut overrides = Vec::new();
    if let Some(path) = &cli.store_path {
        overrides.push(("storage.path", path.to_string_lossy().into_owned()));
    }
    if let Some(addr) = &cli.listen_addr {
        overrides.push(("server.listen_addr", addr.clone()));
    }

    let explicit_path = match source {
        ConfigSource::Default => None,
        _ => Some(config_path.as_str()),
    };
    let cfg = match load_config_with_overrides(explicit_path, &overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    sessmem_server::observability::apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Session store initialization failed");
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
        std::process::exit(1);
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: SESSMEM_CONFIG
/// 3. Default: sessmem.toml
fn resolve_config_path(cli: Option<String>) -> (String, ConfigSource) {
    if let Some(path) = cli {
        return (path, ConfigSource::CliArgument);
    }

    if let Ok(path) = env::var("SESSMEM_CONFIG") {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    (DEFAULT_CONFIG_FILE.to_string(), ConfigSource::Default)
}
