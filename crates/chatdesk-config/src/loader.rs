// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with figment.
//!
//! Merge order, later wins: compiled defaults, `/etc/chatdesk/chatdesk.toml`,
//! `$XDG_CONFIG_HOME/chatdesk/chatdesk.toml`, `./chatdesk.toml`, then
//! `CHATDESK_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ChatdeskConfig;

/// Section names recognised in `CHATDESK_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &["admin", "transport", "relay", "storage", "notifications"];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/chatdesk/chatdesk.toml";
pub(crate) const LOCAL_CONFIG: &str = "chatdesk.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("chatdesk/chatdesk.toml"))
        .unwrap_or_default()
}

/// The full figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Load configuration from the standard hierarchy with env overrides.
pub fn load_config() -> Result<ChatdeskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<ChatdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file, still honouring env overrides.
pub fn load_config_from_path(path: &Path) -> Result<ChatdeskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ChatdeskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// `CHATDESK_TRANSPORT_BASE_URL` maps to `transport.base_url`. Only the
/// first underscore after a known section becomes a dot, since key names
/// themselves contain underscores. Figment hands the key over in its
/// original case, so matching is done on the lowercased form.
fn env_provider() -> Env {
    Env::prefixed("CHATDESK_").map(|key| env_key_to_path(key.as_str()).into())
}

pub(crate) fn env_key_to_path(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(env_key_to_path("transport_base_url"), "transport.base_url");
        assert_eq!(
            env_key_to_path("storage_notifications_key"),
            "storage.notifications_key"
        );
        assert_eq!(
            env_key_to_path("notifications_sound_enabled"),
            "notifications.sound_enabled"
        );
        assert_eq!(env_key_to_path("unrelated"), "unrelated");
    }

    #[test]
    fn env_keys_match_sections_in_any_case() {
        assert_eq!(
            env_key_to_path("STORAGE_SESSIONS_KEY"),
            "storage.sessions_key"
        );
        assert_eq!(env_key_to_path("Relay_Mode"), "relay.mode");
        assert_eq!(
            env_key_to_path("TRANSPORT_BASE_URL"),
            "transport.base_url"
        );
        assert_eq!(env_key_to_path("ADMIN"), "admin");
    }
}
