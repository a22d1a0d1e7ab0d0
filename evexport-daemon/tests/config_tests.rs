//! Configuration loading and validation tests.
//!
//! Tests TOML parsing, environment variable overrides, partial configs, and validation.

use std::env;
use std::io::Write;

use evexport_core::config::EvexportConfig;
use evexport_core::types::Severity;
use serial_test::serial;

#[test]
fn test_parse_full_config() {
    // Given: A complete TOML config
    let toml_str = r#"
[general]
log_level = "debug"
log_format = "pretty"

[exporter]
endpoint = "udp://10.1.2.3:7000"
export_alerts = true
export_flows = false
export_stats = false
min_severity = "high"
buffer_size = 5000
flush_interval_ms = 250
reconnect_interval_ms = 50
linger_ms = 2000

[metrics]
enabled = true
listen_addr = "127.0.0.1"
port = 9300
endpoint = "/metrics"
"#;

    // When: Parsing config
    let config = EvexportConfig::parse(toml_str).expect("full config should parse");

    // Then: Every section reflects the file
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.exporter.endpoint, "udp://10.1.2.3:7000");
    assert!(!config.exporter.export_flows);
    assert_eq!(config.exporter.min_severity, Severity::High);
    assert_eq!(config.exporter.buffer_size, 5000);
    assert_eq!(config.exporter.flush_interval_ms, 250);
    assert_eq!(config.exporter.linger_ms, 2000);
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.port, 9300);
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_partial_config_with_defaults() {
    // Given: Only the exporter endpoint is set
    let toml_str = r#"
[exporter]
endpoint = "tcp://collector:5555"
"#;

    // When: Parsing config
    let config = EvexportConfig::parse(toml_str).expect("partial config should parse");

    // Then: Everything else falls back to defaults
    assert_eq!(config.exporter.endpoint, "tcp://collector:5555");
    assert_eq!(config.exporter.buffer_size, 10_000);
    assert_eq!(config.exporter.flush_interval_ms, 1_000);
    assert_eq!(config.exporter.min_severity, Severity::Low);
    assert!(config.exporter.export_alerts);
    assert!(config.exporter.export_flows);
    assert!(!config.exporter.export_stats);
    assert_eq!(config.general.log_level, "info");
    assert!(!config.metrics.enabled);
}

#[test]
fn test_example_config_is_valid() {
    let toml_str = include_str!("../../evexport.toml.example");
    let config = EvexportConfig::parse(toml_str).expect("example config should parse");
    assert!(config.validate().is_ok());
}

#[test]
fn test_parse_rejects_malformed_toml() {
    let result = EvexportConfig::parse("[exporter\nendpoint = ");
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_out_of_range_buffer() {
    let mut config = EvexportConfig::default();
    config.exporter.buffer_size = 50;
    assert!(config.validate().is_err());

    config.exporter.buffer_size = 100_001;
    assert!(config.validate().is_err());

    config.exporter.buffer_size = 100;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_rejects_bad_log_level() {
    let mut config = EvexportConfig::default();
    config.general.log_level = "verbose".to_owned();
    assert!(config.validate().is_err());
}

#[test]
#[serial]
fn test_env_overrides_apply() {
    // Given: Environment overrides for several sections
    // SAFETY: serialized test, no other thread reads the environment concurrently
    unsafe {
        env::set_var("EVEXPORT_EXPORTER_ENDPOINT", "udp://127.0.0.1:9999");
        env::set_var("EVEXPORT_EXPORTER_BUFFER_SIZE", "2000");
        env::set_var("EVEXPORT_EXPORTER_MIN_SEVERITY", "critical");
        env::set_var("EVEXPORT_GENERAL_LOG_LEVEL", "warn");
    }

    // When: Applying overrides on defaults
    let mut config = EvexportConfig::default();
    config.apply_env_overrides();

    // SAFETY: see above
    unsafe {
        env::remove_var("EVEXPORT_EXPORTER_ENDPOINT");
        env::remove_var("EVEXPORT_EXPORTER_BUFFER_SIZE");
        env::remove_var("EVEXPORT_EXPORTER_MIN_SEVERITY");
        env::remove_var("EVEXPORT_GENERAL_LOG_LEVEL");
    }

    // Then: Overrides win
    assert_eq!(config.exporter.endpoint, "udp://127.0.0.1:9999");
    assert_eq!(config.exporter.buffer_size, 2000);
    assert_eq!(config.exporter.min_severity, Severity::Critical);
    assert_eq!(config.general.log_level, "warn");
}

#[test]
#[serial]
fn test_env_override_with_invalid_number_is_ignored() {
    // SAFETY: serialized test
    unsafe {
        env::set_var("EVEXPORT_EXPORTER_FLUSH_INTERVAL_MS", "soon");
    }

    let mut config = EvexportConfig::default();
    config.apply_env_overrides();

    // SAFETY: serialized test
    unsafe {
        env::remove_var("EVEXPORT_EXPORTER_FLUSH_INTERVAL_MS");
    }

    assert_eq!(config.exporter.flush_interval_ms, 1_000);
}

#[tokio::test]
#[serial]
async fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        "[exporter]\nendpoint = \"tcp://10.9.9.9:6000\"\nbuffer_size = 500"
    )
    .expect("write config");

    let config = EvexportConfig::load(file.path())
        .await
        .expect("config should load");

    assert_eq!(config.exporter.endpoint, "tcp://10.9.9.9:6000");
    assert_eq!(config.exporter.buffer_size, 500);
}

#[tokio::test]
async fn test_load_missing_file_fails() {
    let result = EvexportConfig::load("/nonexistent/evexport.toml").await;
    assert!(result.is_err());
}
