// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks run after deserialization.
//!
//! All problems are collected before returning so a single run reports
//! every mistake in the file.

use crate::diagnostic::ConfigError;
use crate::model::{ChatdeskConfig, RelayMode};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
pub fn validate_config(config: &ChatdeskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.admin.log_level.as_str()) {
        fail(format!(
            "admin.log_level `{}` must be one of: {}",
            config.admin.log_level,
            LOG_LEVELS.join(", ")
        ));
    }
    if config.admin.name.trim().is_empty() {
        fail("admin.name must not be empty".to_string());
    }

    let transport = &config.transport;
    if let Some(url) = &transport.base_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!(
            "transport.base_url `{url}` must start with http:// or https://"
        ));
    }
    for (key, path) in [
        ("events_path", &transport.events_path),
        ("messages_path", &transport.messages_path),
        ("sessions_path", &transport.sessions_path),
    ] {
        if !path.starts_with('/') {
            fail(format!("transport.{key} `{path}` must start with `/`"));
        }
    }
    if transport.max_reconnect_attempts < 1 {
        fail("transport.max_reconnect_attempts must be at least 1".to_string());
    }
    if transport.reconnect_base_delay_ms < 1 {
        fail("transport.reconnect_base_delay_ms must be at least 1".to_string());
    }
    if transport.request_timeout_secs < 1 {
        fail("transport.request_timeout_secs must be at least 1".to_string());
    }
    if transport.simulated_interval_secs < 1 {
        fail("transport.simulated_interval_secs must be at least 1".to_string());
    }

    let relay = &config.relay;
    if relay.channel_name.trim().is_empty() {
        fail("relay.channel_name must not be empty".to_string());
    }
    if relay.mode == RelayMode::Websocket {
        match relay.relay_url.as_deref() {
            None => fail("relay.relay_url is required when relay.mode = \"websocket\"".to_string()),
            Some(url) if !(url.starts_with("ws://") || url.starts_with("wss://")) => {
                fail(format!("relay.relay_url `{url}` must start with ws:// or wss://"))
            }
            Some(_) => {}
        }
    }
    if relay.mode == RelayMode::Storage && relay.poll_interval_ms < 1 {
        fail("relay.poll_interval_ms must be at least 1".to_string());
    }
    if relay.listen_host.trim().is_empty() {
        fail("relay.listen_host must not be empty".to_string());
    }

    let storage = &config.storage;
    if storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }
    if storage.sessions_key.trim().is_empty() {
        fail("storage.sessions_key must not be empty".to_string());
    }
    if storage.notifications_key.trim().is_empty() {
        fail("storage.notifications_key must not be empty".to_string());
    }
    if storage.sessions_key == storage.notifications_key {
        fail(format!(
            "storage.sessions_key and storage.notifications_key must differ (both `{}`)",
            storage.sessions_key
        ));
    }

    if let Some(player) = &config.notifications.sound_player
        && player.trim().is_empty()
    {
        fail("notifications.sound_player must not be empty when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
