use std::{env, fs, time::Duration};

use sessmem_server::config::loader::{load_config, load_config_with_overrides};

#[test]
fn config_parsing_and_overrides_and_validation() {
    // Create a temporary TOML configuration file
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("sessmem.toml");

    let toml_content = r#"
[server]
listen_addr = "127.0.0.1:9091"
body_limit_bytes = 4096

[storage]
path = "/var/lib/sessmem/cache.redb"
purge_interval = "30s"

[sessions]
freeze_window = "5s"
code_lifetime = "10m"
code_cooldown = "2m"
code_length = 8

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.server.listen_addr.port(), 9091);
    assert_eq!(cfg.server.body_limit_bytes, 4096);
    assert_eq!(cfg.storage.purge_interval, Duration::from_secs(30));
    assert_eq!(cfg.sessions.freeze_window, Duration::from_secs(5));
    assert_eq!(cfg.sessions.code_cooldown, Duration::from_secs(120));
    assert_eq!(cfg.sessions.code_length, 8);
    // Unset keys keep their defaults
    assert_eq!(cfg.sessions.blacklist_retention, Duration::from_secs(30 * 24 * 3600));
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("SESSMEM__SESSIONS__CODE_LENGTH", "10");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.sessions.code_length, 10);
    unsafe {
        env::remove_var("SESSMEM__SESSIONS__CODE_LENGTH");
    }

    // 3) CLI-style overrides win over the file
    let cfg_cli = load_config_with_overrides(
        path.to_str(),
        &[
            ("storage.path", "/tmp/other.redb".to_string()),
            ("server.listen_addr", "0.0.0.0:7000".to_string()),
        ],
    )
    .expect("should apply overrides");
    assert_eq!(cfg_cli.storage.path.to_str(), Some("/tmp/other.redb"));
    assert_eq!(cfg_cli.server.listen_addr.port(), 7000);

    // 4) Invalid config (cool-down longer than lifetime) should error
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[sessions]
code_lifetime = "1m"
code_cooldown = "5m"
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.contains("code_cooldown must be <="));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let cfg = load_config(path.to_str()).expect("defaults are valid");
    assert_eq!(cfg.server.listen_addr.port(), 8080);
    assert_eq!(cfg.storage.purge_interval, Duration::from_secs(300));
}
