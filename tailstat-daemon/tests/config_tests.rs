//! Configuration loading and validation tests.
//!
//! Tests TOML parsing, environment variable overrides, partial configs,
//! and validation from the daemon's point of view.

use serial_test::serial;
use tailstat_core::config::TailstatConfig;

#[test]
fn test_parse_full_config() {
    // Given: A complete TOML config
    let toml_str = r#"
[general]
log_level = "debug"
log_format = "json"
pid_file = "/var/run/tailstat.pid"

[analyzer]
enabled = true
log_path = "/var/log/nginx/access.log"
poll_interval_secs = 5
recover_backoff_secs = 10

[metrics]
enabled = true
listen_addr = "127.0.0.1"
port = 9184
endpoint = "/metrics"
"#;

    // When: Parsing
    let config = TailstatConfig::parse(toml_str).expect("should parse full config");

    // Then: All values present
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.pid_file, "/var/run/tailstat.pid");
    assert_eq!(config.analyzer.log_path, "/var/log/nginx/access.log");
    assert_eq!(config.analyzer.poll_interval_secs, 5);
    assert_eq!(config.metrics.port, 9184);
    config.validate().expect("full config should validate");
}

#[test]
fn test_partial_config_uses_defaults() {
    let toml_str = r#"
[analyzer]
log_path = "/custom/access.log"
"#;
    let config = TailstatConfig::parse(toml_str).expect("should parse partial config");

    assert_eq!(config.analyzer.log_path, "/custom/access.log");
    // Unspecified sections fall back to defaults
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.metrics.endpoint, "/metrics");
}

#[test]
fn test_invalid_toml_rejected() {
    let result = TailstatConfig::parse("analyzer = [[[");
    assert!(result.is_err());
}

#[test]
fn test_validation_catches_bad_values() {
    let toml_str = r#"
[analyzer]
poll_interval_secs = 0
"#;
    let config = TailstatConfig::parse(toml_str).expect("parse should succeed");
    assert!(config.validate().is_err());
}

#[tokio::test]
async fn test_load_from_file_roundtrip() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("tailstat.toml");
    std::fs::write(
        &path,
        r#"
[general]
log_level = "warn"

[analyzer]
log_path = "logs/access.log"

[metrics]
enabled = false
"#,
    )
    .expect("failed to write config file");

    let config = TailstatConfig::load(&path).await.expect("load should succeed");
    assert_eq!(config.general.log_level, "warn");
    assert!(!config.metrics.enabled);
}

#[tokio::test]
async fn test_load_missing_file_reports_not_found() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let missing = dir.path().join("missing.toml");

    let err = TailstatConfig::load(&missing).await.unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
#[serial]
async fn test_load_applies_env_overrides() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("tailstat.toml");
    std::fs::write(
        &path,
        r#"
[analyzer]
log_path = "logs/access.log"
"#,
    )
    .expect("failed to write config file");

    // SAFETY: serial test -- no other test touches these env vars concurrently
    unsafe {
        std::env::set_var("TAILSTAT_ANALYZER_LOG_PATH", "/override/access.log");
    }

    let config = TailstatConfig::load(&path).await.expect("load should succeed");
    assert_eq!(config.analyzer.log_path, "/override/access.log");

    unsafe {
        std::env::remove_var("TAILSTAT_ANALYZER_LOG_PATH");
    }
}
