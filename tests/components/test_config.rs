//! Tests for components/config.rs

use std::time::Duration;

use kodegen_notify_enrich::EnrichmentConfig;
use kodegen_notify_enrich::components::config::parse_version;

#[test]
fn test_defaults() {
    let config = EnrichmentConfig::default();
    assert_eq!(config.default_sender_name, "New Message");
    assert_eq!(config.unknown_sender_id, "unknown");
    assert_eq!(config.max_avatar_bytes, 10 * 1024 * 1024);
    assert_eq!(config.connect_timeout(), None);
    assert_eq!(config.request_timeout(), None);
    assert_eq!(config.time_budget(), Duration::from_secs(30));
    assert_eq!(config.scratch_dir(), std::env::temp_dir());
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = EnrichmentConfig::from_json_str(
        r#"{ "default_sender_name": "Nouveau message", "request_timeout_ms": 5000 }"#,
    )
    .unwrap();

    assert_eq!(config.default_sender_name, "Nouveau message");
    assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    assert_eq!(config.unknown_sender_id, "unknown");
    assert_eq!(config.platform_version, "17.0");
}

#[test]
fn test_invalid_config_rejected() {
    assert!(EnrichmentConfig::from_json_str("not json").is_err());
    assert!(EnrichmentConfig::from_json_str(r#"{ "default_sender_name": " " }"#).is_err());
    assert!(EnrichmentConfig::from_json_str(r#"{ "max_avatar_bytes": 0 }"#).is_err());
    assert!(EnrichmentConfig::from_json_str(r#"{ "time_budget_ms": 0 }"#).is_err());
    assert!(EnrichmentConfig::from_json_str(r#"{ "request_timeout_ms": 0 }"#).is_err());
    assert!(EnrichmentConfig::from_json_str(r#"{ "connect_timeout_ms": 0 }"#).is_err());
    assert!(EnrichmentConfig::from_json_str(r#"{ "platform_version": "ios" }"#).is_err());
}

#[test]
fn test_from_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("enrich.json");
    std::fs::write(&path, r#"{ "scratch_dir": "/tmp/avatars", "platform_version": "14.8" }"#).unwrap();

    let config = EnrichmentConfig::from_path(&path).unwrap();
    assert_eq!(config.scratch_dir(), std::path::PathBuf::from("/tmp/avatars"));
    assert_eq!(config.platform_version, "14.8");

    assert!(EnrichmentConfig::from_path(dir.path().join("missing.json")).is_err());
}

#[test]
fn test_builder_methods() {
    let config = EnrichmentConfig::new()
        .with_scratch_dir("/var/tmp/x")
        .with_max_avatar_bytes(1024)
        .with_time_budget(Duration::from_millis(10))
        .with_platform_version("16.4");

    assert_eq!(config.max_avatar_bytes, 1024);
    assert_eq!(config.time_budget(), Duration::from_millis(10));
    assert_eq!(config.platform_version, "16.4");
}

#[test]
fn test_sub_second_durations_are_kept() {
    let config = EnrichmentConfig::new()
        .with_connect_timeout(Duration::from_millis(250))
        .with_request_timeout(Duration::from_millis(800))
        .with_time_budget(Duration::from_millis(1500));

    assert_eq!(config.connect_timeout(), Some(Duration::from_millis(250)));
    assert_eq!(config.request_timeout(), Some(Duration::from_millis(800)));
    assert_eq!(config.time_budget(), Duration::from_millis(1500));
    assert!(config.validate().is_ok());

    // Sub-millisecond values round up instead of collapsing to zero
    let config = EnrichmentConfig::new().with_request_timeout(Duration::from_micros(10));
    assert_eq!(config.request_timeout(), Some(Duration::from_millis(1)));
    assert!(config.validate().is_ok());

    let config = EnrichmentConfig::new().with_time_budget(Duration::ZERO);
    assert!(config.validate().is_err());
}

#[test]
fn test_parse_version() {
    assert_eq!(parse_version("17"), Some((17, 0, 0)));
    assert_eq!(parse_version("15.4"), Some((15, 4, 0)));
    assert_eq!(parse_version("15.4.1"), Some((15, 4, 1)));
    assert_eq!(parse_version(""), None);
    assert_eq!(parse_version("15.x"), None);
    assert_eq!(parse_version("1.2.3.4"), None);
}
