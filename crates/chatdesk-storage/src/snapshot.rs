// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned snapshot documents.
//!
//! A snapshot is written as `{"schemaVersion": N, "<field>": [...]}`.
//! Readers also accept the older unversioned form, a bare JSON array, and
//! skip individual entries that no longer deserialize.

use chatdesk_core::ChatdeskError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

const VERSION_FIELD: &str = "schemaVersion";

/// Serialize `items` under `field` with the current schema version.
pub fn encode_snapshot<T: Serialize>(field: &str, items: &[T]) -> Result<String, ChatdeskError> {
    let mut doc = serde_json::Map::new();
    doc.insert(VERSION_FIELD.into(), Value::from(SCHEMA_VERSION));
    doc.insert(field.into(), serde_json::to_value(items)?);
    Ok(serde_json::to_string(&Value::Object(doc))?)
}

/// Decode a snapshot written by any version.
///
/// Unreadable documents yield an empty list and a warning. Entries that
/// fail to deserialize are dropped one by one.
pub fn decode_snapshot<T: DeserializeOwned>(raw: &str, field: &str) -> Vec<T> {
    let doc: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(field, error = %e, "snapshot is not valid JSON, starting empty");
            return Vec::new();
        }
    };

    let entries = match doc {
        Value::Array(entries) => entries,
        Value::Object(mut obj) => {
            let version = obj.get(VERSION_FIELD).and_then(Value::as_u64);
            if let Some(v) = version
                && v > u64::from(SCHEMA_VERSION)
            {
                warn!(field, version = v, "snapshot written by a newer version");
            }
            match obj.remove(field) {
                Some(Value::Array(entries)) => entries,
                _ => {
                    warn!(field, "snapshot has no entry list, starting empty");
                    return Vec::new();
                }
            }
        }
        _ => {
            warn!(field, "unexpected snapshot shape, starting empty");
            return Vec::new();
        }
    };

    let total = entries.len();
    let items: Vec<T> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect();
    if items.len() < total {
        warn!(
            field,
            skipped = total - items.len(),
            "dropped unreadable snapshot entries"
        );
    }
    items
}

/// Decode a snapshot that must be complete.
///
/// Accepts the same shapes as [`decode_snapshot`] but fails instead of
/// dropping anything, so a damaged document never stands in for real state.
/// An empty list is valid.
pub fn decode_snapshot_strict<T: DeserializeOwned>(
    doc: &Value,
    field: &str,
) -> Result<Vec<T>, ChatdeskError> {
    let entries = match doc {
        Value::Array(entries) => entries,
        Value::Object(obj) => match obj.get(field) {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(ChatdeskError::Validation {
                    message: format!("snapshot has no `{field}` list"),
                });
            }
        },
        _ => {
            return Err(ChatdeskError::Validation {
                message: "snapshot is neither a list nor an object".into(),
            });
        }
    };
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry.clone()).map_err(|e| ChatdeskError::Validation {
                message: format!("snapshot entry {index} is unreadable: {e}"),
            })
        })
        .collect()
}
