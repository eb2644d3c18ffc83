// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session store.
//!
//! Every command is a single transition applied under the state lock. The
//! resulting snapshot is then persisted and broadcast while the commit lock
//! is held, so snapshots leave the instance in the order they were made.

use std::sync::{Arc, Mutex, MutexGuard};

use chatdesk_core::{
    AssignedAdmin, Attachment, ChatSession, ChatTransport, ChatdeskError, HandlerId, Message,
    MessageStatus, OutboundDelivery, Priority, Sender, SessionStats, SessionStatus,
    SnapshotStore, VisitorInfo,
};
use chatdesk_notify::NotificationEngine;
use chatdesk_relay::{SESSIONS_UPDATED, SyncRelay};
use chatdesk_storage::{decode_snapshot, encode_snapshot};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::filter::SessionFilter;

pub(crate) const SNAPSHOT_FIELD: &str = "sessions";

pub(crate) struct Persistence {
    pub(crate) store: Arc<dyn SnapshotStore>,
    pub(crate) key: String,
}

#[derive(Default)]
pub(crate) struct State {
    /// Newest first.
    pub(crate) sessions: Vec<ChatSession>,
    pub(crate) active: Option<String>,
    pub(crate) filter: SessionFilter,
}

pub(crate) struct Inner {
    pub(crate) state: Mutex<State>,
    pub(crate) commit: tokio::sync::Mutex<()>,
    pub(crate) transport: Arc<dyn ChatTransport>,
    pub(crate) notifications: Arc<NotificationEngine>,
    pub(crate) relay: Option<Arc<SyncRelay>>,
    pub(crate) persistence: Option<Persistence>,
    pub(crate) deliveries: TaskTracker,
    pub(crate) drivers: TaskTracker,
    pub(crate) cancel: CancellationToken,
    pub(crate) transport_handler: Mutex<Option<HandlerId>>,
}

/// Handle to one instance's session state. Clones share the same state.
#[derive(Clone)]
pub struct SessionStore {
    pub(crate) inner: Arc<Inner>,
}

/// Assembles a [`SessionStore`] from its collaborators.
pub struct SessionStoreBuilder {
    transport: Arc<dyn ChatTransport>,
    notifications: Option<Arc<NotificationEngine>>,
    relay: Option<Arc<SyncRelay>>,
    persistence: Option<Persistence>,
}

impl SessionStoreBuilder {
    pub fn notifications(mut self, engine: Arc<NotificationEngine>) -> Self {
        self.notifications = Some(engine);
        self
    }

    pub fn relay(mut self, relay: Arc<SyncRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Persist the session list under `key` after every commit.
    pub fn persistence(mut self, store: Arc<dyn SnapshotStore>, key: impl Into<String>) -> Self {
        self.persistence = Some(Persistence {
            store,
            key: key.into(),
        });
        self
    }

    pub fn build(self) -> SessionStore {
        SessionStore {
            inner: Arc::new(Inner {
                state: Mutex::new(State::default()),
                commit: tokio::sync::Mutex::new(()),
                transport: self.transport,
                notifications: self
                    .notifications
                    .unwrap_or_else(|| Arc::new(NotificationEngine::new())),
                relay: self.relay,
                persistence: self.persistence,
                deliveries: TaskTracker::new(),
                drivers: TaskTracker::new(),
                cancel: CancellationToken::new(),
                transport_handler: Mutex::new(None),
            }),
        }
    }
}

impl SessionStore {
    pub fn builder(transport: Arc<dyn ChatTransport>) -> SessionStoreBuilder {
        SessionStoreBuilder {
            transport,
            notifications: None,
            relay: None,
            persistence: None,
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn notifications(&self) -> &Arc<NotificationEngine> {
        &self.inner.notifications
    }

    pub fn relay(&self) -> Option<&Arc<SyncRelay>> {
        self.inner.relay.as_ref()
    }

    pub fn transport(&self) -> &Arc<dyn ChatTransport> {
        &self.inner.transport
    }

    /// Replace the in-memory sessions with the persisted snapshot.
    pub async fn load(&self) -> Result<usize, ChatdeskError> {
        let Some(p) = &self.inner.persistence else {
            return Ok(0);
        };
        let mut sessions: Vec<ChatSession> = match p.store.get(&p.key).await? {
            Some(raw) => decode_snapshot(&raw, SNAPSHOT_FIELD),
            None => Vec::new(),
        };
        for session in &mut sessions {
            session.reconcile();
        }
        let count = sessions.len();
        let mut state = self.state();
        state.sessions = sessions;
        state.active = None;
        info!(count, "sessions loaded");
        Ok(count)
    }

    /// Persist and broadcast `sessions`. Caller holds the commit lock.
    pub(crate) async fn commit(&self, sessions: &[ChatSession]) {
        let raw = match encode_snapshot(SNAPSHOT_FIELD, sessions) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "failed to encode session snapshot");
                return;
            }
        };
        if let Some(p) = &self.inner.persistence
            && let Err(e) = p.store.put(&p.key, raw.clone()).await
        {
            warn!(error = %e, "failed to persist sessions");
        }
        if let Some(relay) = &self.inner.relay {
            match serde_json::from_str(&raw) {
                Ok(payload) => {
                    relay.publish(SESSIONS_UPDATED, payload).await;
                }
                Err(e) => warn!(error = %e, "failed to build relay payload"),
            }
        }
    }

    /// Apply `f` to one session as a single transition.
    ///
    /// `f` returns false when it changed nothing; then timestamps stay put
    /// and nothing is persisted or broadcast. Returns the updated session
    /// when something changed.
    pub(crate) async fn update<F>(
        &self,
        session_id: &str,
        f: F,
    ) -> Result<Option<ChatSession>, ChatdeskError>
    where
        F: FnOnce(&mut ChatSession) -> Result<bool, ChatdeskError>,
    {
        let _commit = self.inner.commit.lock().await;
        let (updated, snapshot) = {
            let mut state = self.state();
            let session = state
                .sessions
                .iter_mut()
                .find(|s| s.id == session_id)
                .ok_or_else(|| ChatdeskError::session_not_found(session_id))?;
            if !f(session)? {
                return Ok(None);
            }
            session.touch();
            session.reconcile();
            let updated = session.clone();
            (updated, state.sessions.clone())
        };
        self.commit(&snapshot).await;
        Ok(Some(updated))
    }

    /// Open a new session and return its id.
    ///
    /// The id comes from the remote backend when it answers, otherwise a
    /// local `local-<uuid>` id is used. Never fails.
    pub async fn create_session(&self, visitor: VisitorInfo) -> String {
        let remote = match self.inner.transport.create_session(&visitor).await {
            Ok(remote) if !remote.id.is_empty() => Some(remote.id),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "remote session allocation failed, using local id");
                None
            }
        };

        let session = {
            let _commit = self.inner.commit.lock().await;
            let (session, snapshot) = {
                let mut state = self.state();
                let id = match remote {
                    Some(id) if !state.sessions.iter().any(|s| s.id == id) => id,
                    _ => format!("local-{}", uuid::Uuid::new_v4()),
                };
                let session = ChatSession::new(id, &visitor, Utc::now());
                state.sessions.insert(0, session.clone());
                (session, state.sessions.clone())
            };
            self.commit(&snapshot).await;
            session
        };

        info!(session_id = %session.id, visitor = %session.visitor_name, "session created");
        self.inner.notifications.on_session_created(&session).await;
        session.id
    }

    /// Append a message and start delivering it.
    ///
    /// The message is stored in `sent` status immediately; a successful
    /// delivery moves it to `delivered` later. Delivery failures leave it
    /// as is.
    pub async fn send_message(
        &self,
        text: &str,
        session_id: &str,
        sender: Sender,
        attachments: Vec<Attachment>,
    ) -> Result<Message, ChatdeskError> {
        if text.trim().is_empty() && attachments.is_empty() {
            return Err(ChatdeskError::Validation {
                message: "message has neither text nor attachments".into(),
            });
        }
        let message = Message::new(session_id, text, sender, attachments);
        let appended = message.clone();
        let session = self
            .update(session_id, move |s| {
                s.messages.push(appended);
                if sender == Sender::Visitor {
                    s.unread_count += 1;
                }
                Ok(true)
            })
            .await?
            .ok_or_else(|| ChatdeskError::Internal("append produced no change".into()))?;

        debug!(session_id, message_id = %message.id, %sender, "message appended");
        self.spawn_delivery(&message);
        self.inner.notifications.on_message(&session, &message).await;
        Ok(message)
    }

    fn spawn_delivery(&self, message: &Message) {
        let store = self.clone();
        let payload = OutboundDelivery::from(message);
        let message_id = message.id.clone();
        self.inner.deliveries.spawn(async move {
            match store.inner.transport.send_message(&payload).await {
                Ok(_) => {
                    if let Err(e) = store.mark_delivered(&payload.session_id, &message_id).await {
                        debug!(error = %e, "delivered message no longer present");
                    }
                }
                Err(e) => {
                    warn!(
                        session_id = %payload.session_id,
                        message_id = %message_id,
                        error = %e,
                        "delivery failed, message stays sent"
                    );
                }
            }
        });
    }

    /// Wait for every delivery started so far to settle.
    pub async fn wait_for_deliveries(&self) {
        self.inner.deliveries.close();
        self.inner.deliveries.wait().await;
        self.inner.deliveries.reopen();
    }

    /// Apply a message that arrived from the backend.
    ///
    /// Returns false when the session is unknown or the message id was
    /// already seen.
    pub async fn receive_message(&self, session_id: &str, mut message: Message) -> bool {
        message.session_id = session_id.to_string();
        let incoming = message.clone();
        let result = self
            .update(session_id, move |s| {
                if s.message(&incoming.id).is_some() {
                    return Ok(false);
                }
                if incoming.sender == Sender::Visitor {
                    s.unread_count += 1;
                }
                s.messages.push(incoming);
                Ok(true)
            })
            .await;
        match result {
            Ok(Some(session)) => {
                debug!(session_id, message_id = %message.id, "inbound message applied");
                self.inner.notifications.on_message(&session, &message).await;
                true
            }
            Ok(None) => {
                debug!(session_id, message_id = %message.id, "duplicate inbound message");
                false
            }
            Err(e) => {
                debug!(session_id, error = %e, "inbound message ignored");
                false
            }
        }
    }

    /// Reset the unread counter. Message statuses are untouched.
    pub async fn mark_as_read(&self, session_id: &str) -> Result<(), ChatdeskError> {
        self.update(session_id, |s| {
            if s.unread_count == 0 {
                return Ok(false);
            }
            s.unread_count = 0;
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// Move a message to `delivered` unless it is already further along.
    pub async fn mark_delivered(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<(), ChatdeskError> {
        self.advance_status(session_id, message_id, MessageStatus::Delivered)
            .await
    }

    /// Move a message to `read`.
    pub async fn mark_message_read(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<(), ChatdeskError> {
        self.advance_status(session_id, message_id, MessageStatus::Read)
            .await
    }

    async fn advance_status(
        &self,
        session_id: &str,
        message_id: &str,
        status: MessageStatus,
    ) -> Result<(), ChatdeskError> {
        self.update(session_id, |s| {
            let message = s
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| ChatdeskError::message_not_found(message_id))?;
            if message.status >= status {
                return Ok(false);
            }
            message.status = status;
            Ok(true)
        })
        .await?;
        Ok(())
    }

    pub async fn close_session(&self, session_id: &str) -> Result<(), ChatdeskError> {
        let closed = self
            .set_status(session_id, SessionStatus::Closed, |_| true)
            .await?;
        if let Some(session) = closed {
            self.inner.notifications.on_session_closed(&session).await;
        }
        Ok(())
    }

    /// Return a closed or archived session to `active`.
    pub async fn reopen_session(&self, session_id: &str) -> Result<(), ChatdeskError> {
        self.set_status(session_id, SessionStatus::Active, |from| {
            matches!(from, SessionStatus::Closed | SessionStatus::Archived)
        })
        .await?;
        Ok(())
    }

    pub async fn archive_session(&self, session_id: &str) -> Result<(), ChatdeskError> {
        self.set_status(session_id, SessionStatus::Archived, |_| true)
            .await?;
        Ok(())
    }

    /// Mark the session as waiting on the visitor.
    pub async fn set_waiting(&self, session_id: &str) -> Result<(), ChatdeskError> {
        self.set_status(session_id, SessionStatus::Waiting, |from| {
            from == SessionStatus::Active
        })
        .await?;
        Ok(())
    }

    async fn set_status(
        &self,
        session_id: &str,
        to: SessionStatus,
        allowed_from: impl FnOnce(SessionStatus) -> bool,
    ) -> Result<Option<ChatSession>, ChatdeskError> {
        let changed = self
            .update(session_id, |s| {
                if s.status == to || !allowed_from(s.status) {
                    return Ok(false);
                }
                s.status = to;
                Ok(true)
            })
            .await?;
        if changed.is_some() {
            debug!(session_id, status = %to, "session status changed");
            self.follow_status(session_id, to);
        }
        Ok(changed)
    }

    /// Keep transport-generated traffic limited to open sessions.
    pub(crate) fn follow_status(&self, session_id: &str, status: SessionStatus) {
        match status {
            SessionStatus::Active | SessionStatus::Waiting => {
                self.inner.transport.track_session(session_id)
            }
            SessionStatus::Closed | SessionStatus::Archived => {
                self.inner.transport.release_session(session_id)
            }
        }
    }

    pub async fn assign_session(
        &self,
        session_id: &str,
        admin_id: &str,
        admin_name: &str,
    ) -> Result<(), ChatdeskError> {
        let admin = AssignedAdmin {
            id: admin_id.to_string(),
            name: admin_name.to_string(),
        };
        let assigned = self
            .update(session_id, move |s| {
                if s.assigned_admin.as_ref() == Some(&admin) {
                    return Ok(false);
                }
                s.assigned_admin = Some(admin);
                Ok(true)
            })
            .await?;
        if let Some(session) = assigned {
            self.inner
                .notifications
                .on_admin_assigned(&session, admin_name)
                .await;
        }
        Ok(())
    }

    pub async fn unassign_session(&self, session_id: &str) -> Result<(), ChatdeskError> {
        self.update(session_id, |s| Ok(s.assigned_admin.take().is_some()))
            .await?;
        Ok(())
    }

    pub async fn set_priority(
        &self,
        session_id: &str,
        priority: Priority,
    ) -> Result<(), ChatdeskError> {
        let changed = self
            .update(session_id, |s| {
                if s.priority == priority {
                    return Ok(false);
                }
                s.priority = priority;
                Ok(true)
            })
            .await?;
        if let Some(session) = changed {
            self.inner
                .notifications
                .on_priority_changed(&session, priority)
                .await;
        }
        Ok(())
    }

    /// Add a tag. Adding a tag that is already present changes nothing.
    pub async fn add_tag(&self, session_id: &str, tag: &str) -> Result<(), ChatdeskError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ChatdeskError::Validation {
                message: "tag must not be empty".into(),
            });
        }
        self.update(session_id, |s| {
            if s.has_tag(tag) {
                return Ok(false);
            }
            s.tags.push(tag.to_string());
            Ok(true)
        })
        .await?;
        Ok(())
    }

    pub async fn remove_tag(&self, session_id: &str, tag: &str) -> Result<(), ChatdeskError> {
        self.update(session_id, |s| {
            let before = s.tags.len();
            s.tags.retain(|t| t != tag);
            Ok(s.tags.len() != before)
        })
        .await?;
        Ok(())
    }

    /// Replace the visitor-supplied identity fields.
    pub async fn update_visitor(
        &self,
        session_id: &str,
        visitor: VisitorInfo,
    ) -> Result<(), ChatdeskError> {
        if visitor.name.trim().is_empty() {
            return Err(ChatdeskError::Validation {
                message: "visitor name must not be empty".into(),
            });
        }
        self.update(session_id, move |s| {
            s.visitor_name = visitor.name;
            s.visitor_email = visitor.email;
            s.visitor_phone = visitor.phone;
            s.ip_address = visitor.ip_address;
            s.user_agent = visitor.user_agent;
            s.page_url = visitor.page_url;
            s.department = visitor.department;
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// Replace a message's text in place.
    pub async fn edit_message(
        &self,
        session_id: &str,
        message_id: &str,
        text: &str,
    ) -> Result<(), ChatdeskError> {
        self.update(session_id, |s| {
            let message = s
                .messages
                .iter_mut()
                .find(|m| m.id == message_id)
                .ok_or_else(|| ChatdeskError::message_not_found(message_id))?;
            if message.text == text {
                return Ok(false);
            }
            message.text = text.to_string();
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// Remove one message, keeping the order of the rest.
    pub async fn delete_message(
        &self,
        session_id: &str,
        message_id: &str,
    ) -> Result<(), ChatdeskError> {
        self.update(session_id, |s| {
            let index = s
                .messages
                .iter()
                .position(|m| m.id == message_id)
                .ok_or_else(|| ChatdeskError::message_not_found(message_id))?;
            s.messages.remove(index);
            Ok(true)
        })
        .await?;
        Ok(())
    }

    /// Remove a session and all of its messages.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), ChatdeskError> {
        let _commit = self.inner.commit.lock().await;
        let snapshot = {
            let mut state = self.state();
            let index = state
                .sessions
                .iter()
                .position(|s| s.id == session_id)
                .ok_or_else(|| ChatdeskError::session_not_found(session_id))?;
            state.sessions.remove(index);
            if state.active.as_deref() == Some(session_id) {
                state.active = None;
            }
            state.sessions.clone()
        };
        self.commit(&snapshot).await;
        self.inner.transport.release_session(session_id);
        info!(session_id, "session deleted");
        Ok(())
    }

    /// Select the session shown to the admin. `None` clears the selection.
    pub fn set_active_session(&self, session_id: Option<&str>) -> Result<(), ChatdeskError> {
        let mut state = self.state();
        if let Some(id) = session_id
            && !state.sessions.iter().any(|s| s.id == id)
        {
            return Err(ChatdeskError::session_not_found(id));
        }
        state.active = session_id.map(str::to_string);
        Ok(())
    }

    pub fn active_session(&self) -> Option<ChatSession> {
        let state = self.state();
        let id = state.active.as_deref()?;
        state.sessions.iter().find(|s| s.id == id).cloned()
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> Vec<ChatSession> {
        self.state().sessions.clone()
    }

    pub fn session(&self, session_id: &str) -> Option<ChatSession> {
        self.state()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    /// Counts by status plus the total unread.
    pub fn get_session_stats(&self) -> SessionStats {
        let state = self.state();
        let mut stats = SessionStats {
            total: state.sessions.len(),
            ..Default::default()
        };
        for session in &state.sessions {
            match session.status {
                SessionStatus::Active => stats.active += 1,
                SessionStatus::Waiting => stats.waiting += 1,
                SessionStatus::Closed => stats.closed += 1,
                SessionStatus::Archived => stats.archived += 1,
            }
            stats.total_unread += u64::from(session.unread_count);
        }
        stats
    }

    /// Stop driver tasks, let in-flight deliveries and alerts settle and
    /// release the relay.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handler = self
            .inner
            .transport_handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(id) = handler {
            self.inner
                .transport
                .off(chatdesk_core::EventKind::NewMessage, id);
        }
        self.inner.drivers.close();
        self.inner.drivers.wait().await;
        self.wait_for_deliveries().await;
        self.inner.notifications.wait_for_alerts().await;
        if let Some(relay) = &self.inner.relay {
            relay.shutdown().await;
        }
        debug!("session store shut down");
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("SessionStore")
            .field("sessions", &state.sessions.len())
            .field("active", &state.active)
            .field("relay", &self.inner.relay)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, store_with};
    use chatdesk_core::NotificationKind;

    #[tokio::test]
    async fn create_session_starts_empty_and_active() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 1);
        let s = &sessions[0];
        assert_eq!(s.id, id);
        assert_eq!(s.status, SessionStatus::Active);
        assert_eq!(s.unread_count, 0);
        assert!(s.messages.is_empty());

        let notes = store.notifications().notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::NewSession);
        assert_eq!(notes[0].session_id, id);
    }

    #[tokio::test]
    async fn create_session_falls_back_to_local_id() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Sara")).await;
        assert!(id.starts_with("local-"));
        assert!(store.session(&id).is_some());
    }

    #[tokio::test]
    async fn visitor_and_admin_messages() {
        let (store, transport) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;

        let hello = store
            .send_message("Hello", &id, Sender::Visitor, vec![])
            .await
            .unwrap();
        assert_eq!(hello.status, MessageStatus::Sent);
        let s = store.session(&id).unwrap();
        assert_eq!(s.unread_count, 1);
        assert_eq!(s.last_message.as_deref(), Some("Hello"));

        store
            .send_message("Hi back", &id, Sender::Admin, vec![])
            .await
            .unwrap();
        let s = store.session(&id).unwrap();
        assert_eq!(s.unread_count, 1);
        assert_eq!(s.last_message.as_deref(), Some("Hi back"));

        let message_notes = store
            .notifications()
            .notifications()
            .into_iter()
            .filter(|n| n.kind == NotificationKind::NewMessage)
            .count();
        assert_eq!(message_notes, 1);

        store.wait_for_deliveries().await;
        let s = store.session(&id).unwrap();
        assert!(s.messages.iter().all(|m| m.status == MessageStatus::Delivered));
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn failed_delivery_keeps_message_sent() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Omar")).await;
        store
            .send_message("anyone there?", &id, Sender::Visitor, vec![])
            .await
            .unwrap();
        store.wait_for_deliveries().await;
        let s = store.session(&id).unwrap();
        assert_eq!(s.messages.len(), 1);
        assert_eq!(s.messages[0].status, MessageStatus::Sent);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let (store, _) = store_with(FakeTransport::online());
        let err = store
            .send_message("x", "nope", Sender::Admin, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatdeskError::NotFound { entity: "session", .. }));
        assert!(store.mark_as_read("nope").await.is_err());
        assert!(store.delete_session("nope").await.is_err());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        let err = store
            .send_message("   ", &id, Sender::Admin, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ChatdeskError::Validation { .. }));
        assert!(store.session(&id).unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn mark_as_read_leaves_message_status() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        for text in ["one", "two"] {
            store
                .send_message(text, &id, Sender::Visitor, vec![])
                .await
                .unwrap();
        }
        store.mark_as_read(&id).await.unwrap();
        let s = store.session(&id).unwrap();
        assert_eq!(s.unread_count, 0);
        assert!(s.messages.iter().all(|m| m.status == MessageStatus::Sent));
    }

    #[tokio::test]
    async fn message_status_never_regresses() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        let m = store
            .send_message("hi", &id, Sender::Visitor, vec![])
            .await
            .unwrap();
        store.mark_message_read(&id, &m.id).await.unwrap();
        store.mark_delivered(&id, &m.id).await.unwrap();
        assert_eq!(
            store.session(&id).unwrap().messages[0].status,
            MessageStatus::Read
        );
        assert!(matches!(
            store.mark_delivered(&id, "missing").await,
            Err(ChatdeskError::NotFound { entity: "message", .. })
        ));
    }

    #[tokio::test]
    async fn status_transitions() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;

        store.close_session(&id).await.unwrap();
        assert_eq!(store.session(&id).unwrap().status, SessionStatus::Closed);
        store.reopen_session(&id).await.unwrap();
        assert_eq!(store.session(&id).unwrap().status, SessionStatus::Active);

        store.set_waiting(&id).await.unwrap();
        assert_eq!(store.session(&id).unwrap().status, SessionStatus::Waiting);
        store.reopen_session(&id).await.unwrap();
        assert_eq!(
            store.session(&id).unwrap().status,
            SessionStatus::Waiting,
            "reopen only applies to closed or archived sessions"
        );

        store.archive_session(&id).await.unwrap();
        let archived = store.session(&id).unwrap();
        store.archive_session(&id).await.unwrap();
        assert_eq!(store.session(&id).unwrap(), archived, "archive is idempotent");
    }

    #[tokio::test]
    async fn tags_are_a_set() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        store.add_tag(&id, "x").await.unwrap();
        let once = store.session(&id).unwrap();
        store.add_tag(&id, "x").await.unwrap();
        assert_eq!(store.session(&id).unwrap(), once);

        store.add_tag(&id, "diesel").await.unwrap();
        store.remove_tag(&id, "x").await.unwrap();
        store.remove_tag(&id, "not-there").await.unwrap();
        assert_eq!(store.session(&id).unwrap().tags, vec!["diesel"]);
    }

    #[tokio::test]
    async fn assignment_and_priority_record_notifications() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;

        store.assign_session(&id, "a1", "Mona").await.unwrap();
        let s = store.session(&id).unwrap();
        assert_eq!(s.assigned_admin.as_ref().unwrap().name, "Mona");
        store.unassign_session(&id).await.unwrap();
        assert!(store.session(&id).unwrap().assigned_admin.is_none());

        store.set_priority(&id, Priority::Urgent).await.unwrap();
        store.set_priority(&id, Priority::Urgent).await.unwrap();
        assert_eq!(store.session(&id).unwrap().priority, Priority::Urgent);

        let kinds: Vec<_> = store
            .notifications()
            .notifications()
            .into_iter()
            .map(|n| n.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                NotificationKind::PriorityChanged,
                NotificationKind::AdminAssigned,
                NotificationKind::NewSession,
            ]
        );
    }

    #[tokio::test]
    async fn delete_message_preserves_order_and_invariants() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        let mut ids = Vec::new();
        for text in ["a", "b", "c"] {
            let m = store
                .send_message(text, &id, Sender::Visitor, vec![])
                .await
                .unwrap();
            ids.push(m.id);
        }
        store.delete_message(&id, &ids[2]).await.unwrap();
        store.delete_message(&id, &ids[0]).await.unwrap();
        let s = store.session(&id).unwrap();
        let texts: Vec<_> = s.messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["b"]);
        assert_eq!(s.unread_count, 1);
        assert_eq!(s.last_message.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn edit_message_refreshes_last_message() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        let m = store
            .send_message("helo", &id, Sender::Admin, vec![])
            .await
            .unwrap();
        store.edit_message(&id, &m.id, "hello").await.unwrap();
        assert_eq!(
            store.session(&id).unwrap().last_message.as_deref(),
            Some("hello")
        );
    }

    #[tokio::test]
    async fn delete_session_clears_selection() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        store.set_active_session(Some(&id)).unwrap();
        assert_eq!(store.active_session().unwrap().id, id);
        assert!(store.set_active_session(Some("missing")).is_err());

        store.delete_session(&id).await.unwrap();
        assert!(store.active_session().is_none());
        assert!(store.sessions().is_empty());
    }

    #[tokio::test]
    async fn receive_message_dedupes_and_counts_unread() {
        let (store, _) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        let inbound = Message::new("ignored", "from the widget", Sender::Visitor, vec![]);

        assert!(store.receive_message(&id, inbound.clone()).await);
        assert!(!store.receive_message(&id, inbound.clone()).await);
        assert!(!store.receive_message("unknown", inbound).await);

        let s = store.session(&id).unwrap();
        assert_eq!(s.messages.len(), 1);
        assert_eq!(s.messages[0].session_id, id);
        assert_eq!(s.unread_count, 1);
    }

    #[tokio::test]
    async fn stats_count_by_status() {
        let (store, _) = store_with(FakeTransport::online());
        let a = store.create_session(VisitorInfo::named("A")).await;
        let b = store.create_session(VisitorInfo::named("B")).await;
        store.create_session(VisitorInfo::named("C")).await;
        store.close_session(&a).await.unwrap();
        store
            .send_message("hi", &b, Sender::Visitor, vec![])
            .await
            .unwrap();

        let stats = store.get_session_stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.total_unread, 1);
    }

    #[tokio::test]
    async fn transport_traffic_follows_open_sessions() {
        let (store, transport) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;

        store.close_session(&id).await.unwrap();
        assert!(transport.fed().is_empty());
        store.reopen_session(&id).await.unwrap();
        assert_eq!(transport.fed(), vec![id.clone()]);
        store.archive_session(&id).await.unwrap();
        assert!(transport.fed().is_empty());

        store.reopen_session(&id).await.unwrap();
        assert_eq!(transport.fed(), vec![id.clone()]);
        store.delete_session(&id).await.unwrap();
        assert!(transport.fed().is_empty());
    }

    fn memory_store() -> Arc<dyn SnapshotStore> {
        Arc::new(chatdesk_storage::SqliteSnapshotStore::new(
            chatdesk_config::StorageConfig {
                database_path: ":memory:".into(),
                ..Default::default()
            },
        ))
    }

    #[tokio::test]
    async fn sessions_survive_reload() {
        let snapshots = memory_store();
        snapshots.initialize().await.unwrap();

        let store = SessionStore::builder(FakeTransport::offline())
            .persistence(Arc::clone(&snapshots), "chat_sessions")
            .build();
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        store
            .send_message("Hello", &id, Sender::Visitor, vec![])
            .await
            .unwrap();
        store.set_priority(&id, Priority::High).await.unwrap();

        let reloaded = SessionStore::builder(FakeTransport::offline())
            .persistence(snapshots, "chat_sessions")
            .build();
        assert_eq!(reloaded.load().await.unwrap(), 1);
        assert_eq!(reloaded.sessions(), store.sessions());
    }

    #[tokio::test]
    async fn legacy_unversioned_snapshot_loads() {
        let snapshots = memory_store();
        snapshots.initialize().await.unwrap();
        snapshots
            .put(
                "chat_sessions",
                r#"[{"id":"old-1","visitorName":"Sara","unreadCount":4,
                     "messages":[{"id":"m1","text":"hi"}]}, {"visitorName":"no id"}]"#
                    .to_string(),
            )
            .await
            .unwrap();

        let store = SessionStore::builder(FakeTransport::offline())
            .persistence(snapshots, "chat_sessions")
            .build();
        assert_eq!(store.load().await.unwrap(), 1);
        let s = store.session("old-1").unwrap();
        assert_eq!(s.unread_count, 1);
        assert_eq!(s.last_message.as_deref(), Some("hi"));
        assert_eq!(s.priority, Priority::Medium);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Visitor,
            Admin,
            Read,
            DeleteFirst,
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                Just(Op::Visitor),
                Just(Op::Admin),
                Just(Op::Read),
                Just(Op::DeleteFirst),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]
            #[test]
            fn unread_never_exceeds_messages(ops in proptest::collection::vec(op(), 0..30)) {
                let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
                rt.block_on(async {
                    let (store, _) = store_with(FakeTransport::offline());
                    let id = store.create_session(VisitorInfo::named("P")).await;
                    for op in ops {
                        match op {
                            Op::Visitor => { store.send_message("v", &id, Sender::Visitor, vec![]).await.unwrap(); }
                            Op::Admin => { store.send_message("a", &id, Sender::Admin, vec![]).await.unwrap(); }
                            Op::Read => store.mark_as_read(&id).await.unwrap(),
                            Op::DeleteFirst => {
                                if let Some(first) = store.session(&id).unwrap().messages.first() {
                                    store.delete_message(&id, &first.id).await.unwrap();
                                }
                            }
                        }
                        let s = store.session(&id).unwrap();
                        assert!(s.unread_count as usize <= s.messages.len());
                        assert_eq!(s.last_message.as_deref(), s.messages.last().map(|m| m.text.as_str()));
                    }
                });
            }
        }
    }
}
