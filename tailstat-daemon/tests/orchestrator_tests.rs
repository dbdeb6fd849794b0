//! Orchestrator integration tests.
//!
//! Tests the flow: config loading -> analyzer init -> health reporting.
//! The metrics recorder is a process-global singleton, so all test
//! configs keep metrics disabled.

use tailstat_core::config::TailstatConfig;
use tailstat_daemon::orchestrator::Orchestrator;

/// Helper function to create a minimal test config (metrics off).
fn minimal_test_config() -> TailstatConfig {
    let toml_str = r#"
[general]
log_level = "info"
pid_file = ""

[analyzer]
enabled = true
log_path = "logs/access.log"

[metrics]
enabled = false
"#;
    TailstatConfig::parse(toml_str).expect("failed to parse minimal config")
}

/// Helper function to create a config with the analyzer disabled.
fn analyzer_disabled_config() -> TailstatConfig {
    let toml_str = r#"
[general]
log_level = "info"

[analyzer]
enabled = false

[metrics]
enabled = false
"#;
    TailstatConfig::parse(toml_str).expect("failed to parse disabled config")
}

#[tokio::test]
async fn build_from_config_succeeds_with_minimal_config() {
    let orchestrator =
        Orchestrator::build_from_config(minimal_test_config()).expect("build should succeed");
    assert!(orchestrator.config().analyzer.enabled);
}

#[tokio::test]
async fn build_from_config_rejects_invalid_config() {
    let mut config = minimal_test_config();
    config.general.log_level = "nonsense".to_owned();

    let result = Orchestrator::build_from_config(config);
    assert!(result.is_err());
}

#[tokio::test]
async fn health_reports_not_started_before_run() {
    let orchestrator =
        Orchestrator::build_from_config(minimal_test_config()).expect("build should succeed");

    let health = orchestrator.health().await;
    assert_eq!(health.modules.len(), 1);
    assert_eq!(health.modules[0].name, "log-analyzer");
    assert!(health.status.is_unhealthy());
}

#[tokio::test]
async fn health_has_no_modules_when_analyzer_disabled() {
    let orchestrator =
        Orchestrator::build_from_config(analyzer_disabled_config()).expect("build should succeed");

    let health = orchestrator.health().await;
    assert!(health.modules.is_empty());
    // 빈 모듈 목록은 healthy로 집계됨
    assert!(health.status.is_healthy());
}

#[tokio::test]
async fn stats_snapshot_starts_empty() {
    let orchestrator =
        Orchestrator::build_from_config(minimal_test_config()).expect("build should succeed");

    let snapshot = orchestrator.stats_snapshot();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn build_from_missing_config_file_fails() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let missing = dir.path().join("does-not-exist.toml");

    let result = Orchestrator::build(&missing).await;
    assert!(result.is_err());
    let msg = result.unwrap_err().to_string();
    assert!(msg.contains("failed to load config"));
}
