// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Export and import of sessions.
//!
//! Import candidates are validated before admission. A candidate needs a
//! non-empty `id`, a non-empty `visitorName` and a parseable `createdAt`;
//! anything else is skipped and the batch continues.

use chatdesk_core::{ChatSession, ChatdeskError};
use chatdesk_storage::encode_snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::SessionStore;
use crate::store::SNAPSHOT_FIELD;

/// Outcome of an import batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Sessions added or replaced.
    pub imported: usize,
    /// Candidates that failed validation.
    pub skipped: usize,
}

/// Check the identity fields and decode one candidate.
pub fn validate_candidate(candidate: Value) -> Result<ChatSession, ChatdeskError> {
    let invalid = |message: &str| ChatdeskError::Validation {
        message: message.to_string(),
    };
    let non_empty = |field: &str| {
        candidate
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.trim().is_empty())
    };
    if !non_empty("id") {
        return Err(invalid("missing id"));
    }
    if !non_empty("visitorName") {
        return Err(invalid("missing visitorName"));
    }
    let created = candidate
        .get("createdAt")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing createdAt"))?;
    created
        .parse::<DateTime<Utc>>()
        .map_err(|e| invalid(&format!("bad createdAt: {e}")))?;

    let mut session: ChatSession = serde_json::from_value(candidate).map_err(|e| {
        ChatdeskError::Validation {
            message: format!("malformed session: {e}"),
        }
    })?;
    session.reconcile();
    Ok(session)
}

impl SessionStore {
    /// Serialize one session.
    pub fn export_session(&self, session_id: &str) -> Result<String, ChatdeskError> {
        let session = self
            .session(session_id)
            .ok_or_else(|| ChatdeskError::session_not_found(session_id))?;
        Ok(serde_json::to_string_pretty(&session)?)
    }

    /// Serialize every session in the persisted snapshot format.
    pub fn export_sessions(&self) -> Result<String, ChatdeskError> {
        encode_snapshot(SNAPSHOT_FIELD, &self.sessions())
    }

    /// Admit valid candidates, replacing sessions with the same id.
    pub async fn import_sessions(&self, candidates: Vec<Value>) -> ImportReport {
        let mut report = ImportReport::default();
        let mut admitted = Vec::new();
        for candidate in candidates {
            match validate_candidate(candidate) {
                Ok(session) => admitted.push(session),
                Err(e) => {
                    debug!(error = %e, "skipping import candidate");
                    report.skipped += 1;
                }
            }
        }
        report.imported = admitted.len();
        if admitted.is_empty() {
            return report;
        }

        let _commit = self.inner.commit.lock().await;
        let snapshot = {
            let mut state = self.state();
            for session in admitted {
                match state.sessions.iter_mut().find(|s| s.id == session.id) {
                    Some(existing) => *existing = session,
                    None => state.sessions.push(session),
                }
            }
            state.sessions.clone()
        };
        self.commit(&snapshot).await;
        info!(imported = report.imported, skipped = report.skipped, "sessions imported");
        report
    }

    /// Import from JSON text: a bare array of sessions, a single session
    /// object, or the `{ "schemaVersion", "sessions" }` snapshot format.
    pub async fn import_sessions_json(&self, raw: &str) -> Result<ImportReport, ChatdeskError> {
        let value: Value = serde_json::from_str(raw)?;
        let candidates = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove(SNAPSHOT_FIELD) {
                Some(Value::Array(items)) => items,
                Some(_) => {
                    return Err(ChatdeskError::Validation {
                        message: format!("`{SNAPSHOT_FIELD}` is not an array"),
                    });
                }
                None => vec![Value::Object(map)],
            },
            _ => {
                return Err(ChatdeskError::Validation {
                    message: "expected a session, a list of sessions or a snapshot".into(),
                });
            }
        };
        Ok(self.import_sessions(candidates).await)
    }
}
