//! Configuration system tests
//!
//! Tests for config paths and source view config loading.

use std::time::Duration;

use reparse::config::SourceConfig;
use reparse::config_paths;

// ========================================================================
// Config Paths Tests
// ========================================================================

#[test]
fn test_config_dir_returns_some() {
    assert!(config_paths::config_dir().is_some());
}

#[test]
fn test_config_dir_contains_app_name() {
    let dir = config_paths::config_dir().unwrap();
    assert!(dir.to_string_lossy().contains("reparse"));
}

#[test]
fn test_config_file_ends_with_yaml() {
    let path = config_paths::config_file().unwrap();
    assert!(path.to_string_lossy().ends_with("config.yaml"));
}

#[test]
fn test_logs_dir_is_subdir_of_config() {
    let config = config_paths::config_dir().unwrap();
    let logs = config_paths::logs_dir().unwrap();
    assert!(logs.starts_with(&config));
}

// ========================================================================
// Source Config Tests
// ========================================================================

#[test]
fn test_default_config() {
    let config = SourceConfig::default();
    assert!(config.redact_includes_on_first_parse);
    assert_eq!(config.retry_interval_ms, 10);
    assert_eq!(config.parse_timeout(), Duration::from_secs(5));
    assert!(config.is_legal_extension("c"));
    assert!(config.is_legal_extension("CPP"));
    assert!(!config.is_legal_extension("rs"));
}

#[test]
fn test_config_serialize_deserialize() {
    let mut config = SourceConfig {
        redact_includes_on_first_parse: false,
        retry_interval_ms: 25,
        ..SourceConfig::default()
    };
    config.tags.insert("variable".to_string(), "var".to_string());

    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed = SourceConfig::from_yaml(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let parsed = SourceConfig::from_yaml("retry_interval_ms: 3\n").unwrap();
    assert_eq!(parsed.retry_interval_ms, 3);
    assert_eq!(parsed.extensions, SourceConfig::default().extensions);
    assert_eq!(parsed.tags, SourceConfig::default().tags);

    let options = parsed.coordinator_options();
    assert_eq!(options.retry_interval, Duration::from_millis(3));
    assert!(options.redact_first_parse);
}

#[test]
fn test_invalid_yaml_is_an_error() {
    assert!(SourceConfig::from_yaml("extensions: 12: [").is_err());
}

#[test]
fn test_tag_lookup_falls_back_to_parent_category() {
    let config = SourceConfig::default();
    assert_eq!(config.tag_for("literal.string"), Some("string"));
    assert_eq!(config.tag_for("literal.boolean"), Some("literal"));
    assert_eq!(config.tag_for("keyword"), Some("keyword"));
    assert_eq!(config.tag_for("punctuation"), None);
    assert_eq!(config.tag_for("identifier"), None);
}

#[test]
fn test_custom_tags_replace_defaults() {
    let parsed = SourceConfig::from_yaml("tags:\n  keyword: kw\n").unwrap();
    assert_eq!(parsed.tag_for("keyword"), Some("kw"));
    assert_eq!(parsed.tag_for("comment"), None);
}
