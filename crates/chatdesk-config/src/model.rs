// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level chatdesk configuration.
///
/// All sections are optional and default to values that run fully offline:
/// no transport endpoint (simulated feed), in-process broadcast relay, and a
/// SQLite file under the XDG data directory.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatdeskConfig {
    /// Admin identity and logging.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Remote chat backend settings.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Cross-instance relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Durable snapshot storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Desktop and audible alert settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

/// Admin identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Display name used when this instance assigns sessions to itself.
    #[serde(default = "default_admin_name")]
    pub name: String,

    /// Stable admin id, `None` means "derive from name".
    #[serde(default)]
    pub id: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            name: default_admin_name(),
            id: None,
            log_level: default_log_level(),
        }
    }
}

fn default_admin_name() -> String {
    "admin".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Remote chat backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Base URL of the chat backend. `None` selects the simulated feed.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Path of the server-sent event stream.
    #[serde(default = "default_events_path")]
    pub events_path: String,

    /// Path for outbound message delivery.
    #[serde(default = "default_messages_path")]
    pub messages_path: String,

    /// Path for remote session allocation.
    #[serde(default = "default_sessions_path")]
    pub sessions_path: String,

    /// Timeout for one-shot requests, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Reconnect attempts before the stream gives up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// First reconnect delay in milliseconds; doubles on every attempt.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Interval between synthesized visitor messages in simulated mode.
    #[serde(default = "default_simulated_interval_secs")]
    pub simulated_interval_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            events_path: default_events_path(),
            messages_path: default_messages_path(),
            sessions_path: default_sessions_path(),
            request_timeout_secs: default_request_timeout_secs(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            simulated_interval_secs: default_simulated_interval_secs(),
        }
    }
}

fn default_events_path() -> String {
    "/events".to_string()
}

fn default_messages_path() -> String {
    "/messages".to_string()
}

fn default_sessions_path() -> String {
    "/sessions".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_base_delay_ms() -> u64 {
    1000
}

fn default_simulated_interval_secs() -> u64 {
    30
}

/// Which state sync implementation to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayMode {
    /// Envelopes exchanged through the shared snapshot database, so every
    /// instance using the same `storage.database_path` stays in step.
    #[default]
    Storage,
    /// In-process named broadcast channel. Links stores of one process only.
    Broadcast,
    /// WebSocket client to a relay process.
    Websocket,
    /// Single-instance operation.
    None,
}

/// Cross-instance relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(default)]
    pub mode: RelayMode,

    /// Well-known channel name shared by every instance.
    #[serde(default = "default_channel_name")]
    pub channel_name: String,

    /// `ws://` URL of the relay process (websocket mode).
    #[serde(default)]
    pub relay_url: Option<String>,

    /// How often storage mode checks the database for a newer envelope.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Bind host for `chatdesk relay`.
    #[serde(default = "default_listen_host")]
    pub listen_host: String,

    /// Bind port for `chatdesk relay`.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mode: RelayMode::default(),
            channel_name: default_channel_name(),
            relay_url: None,
            poll_interval_ms: default_poll_interval_ms(),
            listen_host: default_listen_host(),
            listen_port: default_listen_port(),
        }
    }
}

fn default_channel_name() -> String {
    "chatdesk-sync".to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_listen_port() -> u16 {
    8090
}

/// Durable snapshot storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Key holding the sessions snapshot.
    #[serde(default = "default_sessions_key")]
    pub sessions_key: String,

    /// Key holding the notification list.
    #[serde(default = "default_notifications_key")]
    pub notifications_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            sessions_key: default_sessions_key(),
            notifications_key: default_notifications_key(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("chatdesk").join("chatdesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("chatdesk.db"))
        .to_string_lossy()
        .to_string()
}

fn default_sessions_key() -> String {
    "chat_sessions".to_string()
}

fn default_notifications_key() -> String {
    "chat_notifications".to_string()
}

/// Desktop and audible alert configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationsConfig {
    /// Show desktop notifications for new sessions and visitor messages.
    #[serde(default = "default_true")]
    pub desktop_enabled: bool,

    /// Play the chime for new sessions and visitor messages.
    #[serde(default = "default_true")]
    pub sound_enabled: bool,

    /// External command that plays a WAV file passed as its last argument,
    /// e.g. `aplay -q`. `None` probes a few common players.
    #[serde(default)]
    pub sound_player: Option<String>,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            desktop_enabled: true,
            sound_enabled: true,
            sound_player: None,
        }
    }
}

fn default_true() -> bool {
    true
}
