// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for chatdesk configuration loading.

use chatdesk_config::diagnostic::ConfigError;
use chatdesk_config::model::{ChatdeskConfig, RelayMode};
use chatdesk_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};

#[test]
fn full_toml_deserializes() {
    let toml = r#"
[admin]
name = "Layla"
log_level = "debug"

[transport]
base_url = "https://chat.example.com/api"
max_reconnect_attempts = 3
reconnect_base_delay_ms = 250

[relay]
mode = "websocket"
relay_url = "ws://127.0.0.1:9000/sync"

[storage]
database_path = "/tmp/chatdesk-test.db"
sessions_key = "s"
notifications_key = "n"

[notifications]
desktop_enabled = false
sound_player = "paplay"
"#;

    let config = load_and_validate_str(toml).expect("valid config");
    assert_eq!(config.admin.name, "Layla");
    assert_eq!(config.admin.log_level, "debug");
    assert_eq!(
        config.transport.base_url.as_deref(),
        Some("https://chat.example.com/api")
    );
    assert_eq!(config.transport.max_reconnect_attempts, 3);
    assert_eq!(config.transport.reconnect_base_delay_ms, 250);
    assert_eq!(config.transport.events_path, "/events");
    assert_eq!(config.relay.mode, RelayMode::Websocket);
    assert_eq!(config.storage.sessions_key, "s");
    assert!(!config.notifications.desktop_enabled);
    assert!(config.notifications.sound_enabled);
    assert_eq!(config.notifications.sound_player.as_deref(), Some("paplay"));
}

#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults are valid");
    assert_eq!(config.admin.name, "admin");
    assert!(config.transport.base_url.is_none());
    assert_eq!(config.transport.max_reconnect_attempts, 5);
    assert_eq!(config.transport.reconnect_base_delay_ms, 1000);
    assert_eq!(config.transport.simulated_interval_secs, 30);
    assert_eq!(config.relay.mode, RelayMode::Storage);
    assert_eq!(config.relay.poll_interval_ms, 250);
    assert_eq!(config.relay.channel_name, "chatdesk-sync");
    assert_eq!(config.relay.listen_port, 8090);
    assert_eq!(config.storage.sessions_key, "chat_sessions");
    assert_eq!(config.storage.notifications_key, "chat_notifications");
}

#[test]
fn unknown_key_gets_suggestion_and_valid_keys() {
    let toml = r#"
[relay]
chanel_name = "x"
"#;
    let errors = load_and_validate_str(toml).expect_err("unknown key");
    let hit = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. }
            if key == "chanel_name"
                && suggestion.as_deref() == Some("channel_name")
                && valid_keys.contains("relay_url"))
    });
    assert!(hit, "got: {errors:?}");
}

#[test]
fn unknown_top_level_section_is_rejected() {
    let err = load_config_from_str("[telemetry]\nenabled = true\n").expect_err("unknown section");
    assert!(err.to_string().contains("telemetry"), "got: {err}");
}

#[test]
fn invalid_type_is_reported() {
    let errors =
        load_and_validate_str("[transport]\nmax_reconnect_attempts = \"many\"\n").unwrap_err();
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("max_reconnect_attempts"))),
        "got: {errors:?}"
    );
}

#[test]
fn unknown_relay_mode_is_rejected() {
    assert!(load_and_validate_str("[relay]\nmode = \"carrier-pigeon\"\n").is_err());
}

#[test]
fn semantic_errors_are_collected() {
    let toml = r#"
[transport]
base_url = "chat.example.com"
max_reconnect_attempts = 0

[storage]
sessions_key = "same"
notifications_key = "same"
"#;
    let errors = load_and_validate_str(toml).expect_err("invalid");
    assert_eq!(errors.len(), 3, "got: {errors:?}");
    assert!(
        errors
            .iter()
            .all(|e| matches!(e, ConfigError::Validation { .. }))
    );
}

#[test]
fn dotted_override_merges_over_toml() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: ChatdeskConfig = Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::string("[transport]\nbase_url = \"http://a\"\n"))
        .merge(("transport.base_url", "http://b"))
        .extract()
        .expect("merge");
    assert_eq!(config.transport.base_url.as_deref(), Some("http://b"));
}

#[test]
#[serial_test::serial]
fn env_var_overrides_file_value() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.toml");
    std::fs::write(&path, "[storage]\nsessions_key = \"from_file\"\n").unwrap();

    // SAFETY: serialised test, no other thread reads the environment here.
    unsafe {
        std::env::set_var("CHATDESK_STORAGE_SESSIONS_KEY", "from_env");
    }
    let result = load_and_validate_path(&path);
    unsafe {
        std::env::remove_var("CHATDESK_STORAGE_SESSIONS_KEY");
    }

    let config = result.expect("valid");
    assert_eq!(config.storage.sessions_key, "from_env");
}

#[test]
#[serial_test::serial]
fn upper_case_env_vars_reach_every_section() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chatdesk.toml");
    std::fs::write(&path, "[relay]\nmode = \"storage\"\n").unwrap();

    // SAFETY: serialised test, no other thread reads the environment here.
    unsafe {
        std::env::set_var("CHATDESK_RELAY_MODE", "none");
        std::env::set_var("CHATDESK_ADMIN_LOG_LEVEL", "debug");
        std::env::set_var("CHATDESK_NOTIFICATIONS_SOUND_ENABLED", "false");
    }
    let result = load_and_validate_path(&path);
    unsafe {
        std::env::remove_var("CHATDESK_RELAY_MODE");
        std::env::remove_var("CHATDESK_ADMIN_LOG_LEVEL");
        std::env::remove_var("CHATDESK_NOTIFICATIONS_SOUND_ENABLED");
    }

    let config = result.expect("valid");
    assert_eq!(config.relay.mode, RelayMode::None);
    assert_eq!(config.admin.log_level, "debug");
    assert!(!config.notifications.sound_enabled);
}

#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "mdoe".to_string(),
        suggestion: Some("mode".to_string()),
        valid_keys: "mode, channel_name".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    assert!(error.help().unwrap().to_string().contains("did you mean `mode`"));

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("render");
    assert!(buf.contains("mdoe"));
}
