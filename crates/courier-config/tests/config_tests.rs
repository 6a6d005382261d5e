// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Courier configuration system.

use courier_config::diagnostic::ConfigError;
use courier_config::model::CourierConfig;
use courier_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_courier_config() {
    let toml = r#"
[service]
instance_id = "api-1"
log_level = "debug"

[storage]
database_path = "/tmp/courier-test.db"
wal_mode = false

[queue]
database_path = "/tmp/courier-queue.db"
poll_interval_ms = 100
max_attempts = 5

[workers.call_timeout]
concurrency = 4

[workers.bot_response]
concurrency = 50
rate_limit_max = 200
rate_limit_window_ms = 30000

[calls]
timeout_secs = 45
cancel_timeout_on_resolve = false

[bot]
nudge_pause_ms = 1000

[presence]
lock_ttl_secs = 20
channel = "presence-eu"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.service.instance_id, "api-1");
    assert_eq!(config.service.log_level, "debug");
    assert!(!config.storage.wal_mode);
    assert_eq!(config.queue_database_path(), "/tmp/courier-queue.db");
    assert_eq!(config.lock_database_path(), "/tmp/courier-test.db");
    assert_eq!(config.queue.max_attempts, 5);
    assert_eq!(config.workers.call_timeout.concurrency, 4);
    assert_eq!(config.workers.call_timeout.rate_limit_max, None);
    assert_eq!(config.workers.bot_response.rate_limit_max, Some(200));
    assert_eq!(config.calls.timeout_secs, 45);
    assert!(!config.calls.cancel_timeout_on_resolve);
    assert_eq!(config.bot.nudge_pause_ms, 1000);
    assert_eq!(config.presence.lock_ttl_secs, 20);
    assert_eq!(config.presence.channel, "presence-eu");
}

/// Empty TOML falls back to compiled defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_config_from_str("").expect("empty config should load");
    assert_eq!(config.calls.timeout_secs, 30);
    assert_eq!(config.bot.nudge_pause_ms, 1500);
    assert_eq!(config.presence.lock_ttl_secs, 10);
    assert_eq!(config.workers.call_timeout.concurrency, 10);
    assert_eq!(config.workers.bot_response.concurrency, 100);
    assert_eq!(config.workers.bot_response.rate_limit_max, Some(1000));
    assert_eq!(config.workers.bot_response.rate_limit_window_ms, 60_000);
    assert!(config.service.instance_id.starts_with("courier-"));
}

/// A partial worker table keeps the other defaults for that worker.
#[test]
fn partial_worker_section_merges_with_defaults() {
    let config = load_config_from_str("[workers.bot_response]\nconcurrency = 7\n").unwrap();
    assert_eq!(config.workers.bot_response.concurrency, 7);
    assert_eq!(config.workers.bot_response.rate_limit_max, Some(1000));
}

/// Unknown key in a section is rejected with a suggestion.
#[test]
fn unknown_key_produces_suggestion() {
    let toml = r#"
[calls]
timout_secs = 10
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    let found = errors.iter().any(|e| match e {
        ConfigError::UnknownKey {
            key, suggestion, ..
        } => key == "timout_secs" && suggestion.as_deref() == Some("timeout_secs"),
        _ => false,
    });
    assert!(found, "expected UnknownKey with suggestion, got {errors:?}");
}

/// Unknown top-level section is rejected.
#[test]
fn unknown_section_rejected() {
    let toml = r#"
[telemetry]
enabled = true
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Wrong value types surface as InvalidType.
#[test]
fn wrong_type_is_reported() {
    let toml = r#"
[calls]
timeout_secs = "thirty"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject string");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { .. })),
        "got {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn semantic_validation_rejects_zero_concurrency() {
    let toml = r#"
[workers.call_timeout]
concurrency = 0
"#;
    let errors = load_and_validate_str(toml).expect_err("zero concurrency is invalid");
    assert!(
        errors
            .iter()
            .any(|e| e.to_string().contains("workers.call_timeout.concurrency")),
        "got {errors:?}"
    );
}

/// Default config serializes to TOML and parses back unchanged.
#[test]
fn defaults_survive_toml_round_trip() {
    let defaults = CourierConfig::default();
    let rendered = toml::to_string(&defaults).expect("serialize defaults");
    let parsed = load_config_from_str(&rendered).expect("parse rendered defaults");
    assert_eq!(parsed.service.instance_id, defaults.service.instance_id);
    assert_eq!(parsed.workers.bot_response, defaults.workers.bot_response);
}
