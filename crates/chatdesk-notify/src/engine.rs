// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The notification engine.
//!
//! Produces [`Notification`] records from session events and fires the
//! external alerts. The record list is owned here and referenced back to
//! sessions only by id. Alerts run in the background so a slow desktop
//! or chime never holds up the chat, and their failures never reach the
//! caller.

use std::sync::{Arc, Mutex, MutexGuard};

use chatdesk_core::{
    ChatSession, ChatdeskError, ChimePlayer, DesktopNotifier, Message, Notification,
    NotificationKind, NotificationPermission, Priority, Sender, SnapshotStore,
};
use chatdesk_config::NotificationsConfig;
use chatdesk_storage::{decode_snapshot, encode_snapshot};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, warn};

use crate::chime::SynthChime;
use crate::desktop::SystemDesktopNotifier;

const SNAPSHOT_FIELD: &str = "notifications";
const PREVIEW_CHARS: usize = 120;

struct Persistence {
    store: Arc<dyn SnapshotStore>,
    key: String,
}

/// Notification list plus alert sinks.
#[derive(Default)]
pub struct NotificationEngine {
    // Newest first.
    records: Mutex<Vec<Notification>>,
    desktop: Option<Arc<dyn DesktopNotifier>>,
    chime: Option<Arc<dyn ChimePlayer>>,
    persistence: Option<Persistence>,
    alerts: TaskTracker,
    // One alert at a time: permission is asked once and chimes never overlap.
    alert_turn: Arc<tokio::sync::Mutex<()>>,
}

impl NotificationEngine {
    /// An engine that only keeps records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the system alert sinks the config enables.
    pub fn from_config(config: &NotificationsConfig) -> Self {
        let mut engine = Self::new();
        if config.desktop_enabled {
            engine = engine.with_desktop(Arc::new(SystemDesktopNotifier::new("chatdesk")));
        }
        if config.sound_enabled {
            engine = engine.with_chime(Arc::new(SynthChime::new(config.sound_player.clone())));
        }
        engine
    }

    pub fn with_desktop(mut self, desktop: Arc<dyn DesktopNotifier>) -> Self {
        self.desktop = Some(desktop);
        self
    }

    pub fn with_chime(mut self, chime: Arc<dyn ChimePlayer>) -> Self {
        self.chime = Some(chime);
        self
    }

    /// Persist the list under `key` after every change.
    pub fn with_persistence(mut self, store: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        self.persistence = Some(Persistence {
            store,
            key: key.into(),
        });
        self
    }

    fn records(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the in-memory list with the persisted one.
    pub async fn load(&self) -> Result<usize, ChatdeskError> {
        let Some(p) = &self.persistence else {
            return Ok(0);
        };
        let loaded: Vec<Notification> = match p.store.get(&p.key).await? {
            Some(raw) => decode_snapshot(&raw, SNAPSHOT_FIELD),
            None => Vec::new(),
        };
        let count = loaded.len();
        *self.records() = loaded;
        debug!(count, "notifications loaded");
        Ok(count)
    }

    /// Record and announce a new session.
    pub async fn on_session_created(&self, session: &ChatSession) -> Notification {
        let title = "New chat session";
        let body = format!("{} started a chat", display_name(session));
        let record = self
            .record(NotificationKind::NewSession, &session.id, title, body.clone())
            .await;
        self.alert(title.to_string(), body);
        record
    }

    /// Record and announce a visitor message. Admin messages produce nothing.
    pub async fn on_message(&self, session: &ChatSession, message: &Message) -> Option<Notification> {
        if message.sender == Sender::Admin {
            return None;
        }
        let title = format!("New message from {}", display_name(session));
        let body = preview(&message.text);
        let record = self
            .record(NotificationKind::NewMessage, &session.id, title.clone(), body.clone())
            .await;
        self.alert(title, body);
        Some(record)
    }

    pub async fn on_session_closed(&self, session: &ChatSession) -> Notification {
        let body = format!("Chat with {} was closed", display_name(session));
        self.record(NotificationKind::SessionClosed, &session.id, "Chat closed", body)
            .await
    }

    pub async fn on_admin_assigned(&self, session: &ChatSession, admin_name: &str) -> Notification {
        let body = format!("{} assigned to {admin_name}", display_name(session));
        self.record(NotificationKind::AdminAssigned, &session.id, "Chat assigned", body)
            .await
    }

    pub async fn on_priority_changed(&self, session: &ChatSession, priority: Priority) -> Notification {
        let body = format!("{} is now {priority} priority", display_name(session));
        self.record(NotificationKind::PriorityChanged, &session.id, "Priority changed", body)
            .await
    }

    /// Flip one record to read. Returns false if no record has that id.
    pub async fn mark_notification_as_read(&self, id: &str) -> bool {
        let found = {
            let mut records = self.records();
            match records.iter_mut().find(|n| n.id == id) {
                Some(n) => {
                    n.read = true;
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist().await;
        }
        found
    }

    /// Flip every record to read. Returns how many changed.
    pub async fn mark_all_as_read(&self) -> usize {
        let mut changed = 0;
        for n in self.records().iter_mut().filter(|n| !n.read) {
            n.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.persist().await;
        }
        changed
    }

    /// Drop every record.
    pub async fn clear_notifications(&self) {
        self.records().clear();
        self.persist().await;
    }

    /// Snapshot of the list, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.records().clone()
    }

    pub fn unread_count(&self) -> usize {
        self.records().iter().filter(|n| !n.read).count()
    }

    async fn record(
        &self,
        kind: NotificationKind,
        session_id: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Notification {
        let notification = Notification::new(kind, session_id, title, body);
        self.records().insert(0, notification.clone());
        debug!(kind = %kind, session_id, "notification recorded");
        self.persist().await;
        notification
    }

    /// Wait until every alert fired so far has finished.
    pub async fn wait_for_alerts(&self) {
        self.alerts.close();
        self.alerts.wait().await;
        self.alerts.reopen();
    }

    fn alert(&self, title: String, body: String) {
        if self.desktop.is_none() && self.chime.is_none() {
            return;
        }
        let desktop = self.desktop.clone();
        let chime = self.chime.clone();
        let turn = Arc::clone(&self.alert_turn);
        self.alerts.spawn(
            async move {
                let _turn = turn.lock().await;
                if let Some(desktop) = desktop {
                    let permission = match desktop.permission() {
                        NotificationPermission::Default => desktop.request_permission().await,
                        other => other,
                    };
                    if permission == NotificationPermission::Granted {
                        if let Err(e) = desktop.show(&title, &body).await {
                            warn!(error = %e, "desktop notification failed");
                        }
                    } else {
                        debug!(%permission, "desktop notification skipped");
                    }
                }
                if let Some(chime) = chime
                    && let Err(e) = chime.play().await
                {
                    warn!(error = %e, "chime failed");
                }
            }
            .in_current_span(),
        );
    }

    async fn persist(&self) {
        let Some(p) = &self.persistence else {
            return;
        };
        let encoded = encode_snapshot(SNAPSHOT_FIELD, &self.records());
        let result = match encoded {
            Ok(raw) => p.store.put(&p.key, raw).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            warn!(error = %e, "failed to persist notifications");
        }
    }
}

fn display_name(session: &ChatSession) -> &str {
    if session.visitor_name.trim().is_empty() {
        "A visitor"
    } else {
        &session.visitor_name
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    out.push('…');
    out
}
