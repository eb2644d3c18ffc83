// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Driver tasks connecting the store to the transport and the relay, and
//! the suppress-then-apply path for remote snapshots.

use std::sync::Arc;

use chatdesk_core::{ChatSession, EventKind, Message, RelayEnvelope, TransportEvent};
use chatdesk_relay::SESSIONS_UPDATED;
use chatdesk_storage::decode_snapshot_strict;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::SessionStore;
use crate::store::SNAPSHOT_FIELD;

impl SessionStore {
    /// Replace local state with a snapshot from another instance.
    ///
    /// The relay is suppressed for the whole apply so the persistence step
    /// does not broadcast the snapshot back. Returns false, leaving state
    /// untouched, for envelopes that are not complete session snapshots.
    pub async fn apply_remote(&self, envelope: &RelayEnvelope) -> bool {
        if envelope.kind != SESSIONS_UPDATED {
            debug!(kind = %envelope.kind, "ignoring relay envelope");
            return false;
        }
        let mut sessions: Vec<ChatSession> =
            match decode_snapshot_strict(&envelope.payload, SNAPSHOT_FIELD) {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(source = %envelope.source, error = %e, "rejected relay snapshot");
                    return false;
                }
            };
        for session in &mut sessions {
            session.reconcile();
        }

        let _commit = self.inner.commit.lock().await;
        let _suppress = self.inner.relay.as_ref().map(|r| r.suppress());
        let count = sessions.len();
        let removed: Vec<String> = {
            let mut state = self.state();
            if let Some(active) = state.active.clone()
                && !sessions.iter().any(|s| s.id == active)
            {
                state.active = None;
            }
            let previous = std::mem::replace(&mut state.sessions, sessions.clone());
            previous
                .into_iter()
                .filter(|old| !sessions.iter().any(|s| s.id == old.id))
                .map(|old| old.id)
                .collect()
        };
        self.commit(&sessions).await;
        for session in &sessions {
            self.follow_status(&session.id, session.status);
        }
        for id in &removed {
            self.inner.transport.release_session(id);
        }
        debug!(source = %envelope.source, count, "applied remote snapshot");
        true
    }

    /// Feed inbound `new_message` events from the transport into the store.
    ///
    /// Transport handlers run synchronously, so events are queued and
    /// applied in arrival order by a driver task.
    pub fn attach_transport(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, Message)>();
        let id = self.inner.transport.on(
            EventKind::NewMessage,
            Arc::new(move |event: &TransportEvent| {
                if let TransportEvent::NewMessage {
                    session_id,
                    message,
                } = event
                {
                    let _ = tx.send((session_id.clone(), message.clone()));
                }
            }),
        );
        let previous = self
            .inner
            .transport_handler
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(id);
        if let Some(previous) = previous {
            self.inner.transport.off(EventKind::NewMessage, previous);
        }

        let store = self.clone();
        let cancel = self.inner.cancel.clone();
        self.inner.drivers.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = rx.recv() => match next {
                        Some((session_id, message)) => {
                            store.receive_message(&session_id, message).await;
                        }
                        None => break,
                    },
                }
            }
            debug!("transport driver stopped");
        });
    }

    /// Apply snapshots published by other instances until shutdown.
    pub async fn attach_relay(&self) {
        let Some(relay) = self.inner.relay.clone() else {
            debug!("no relay configured, running single-instance");
            return;
        };
        let mut inbox = relay.inbox().await;
        info!(tab_id = relay.tab_id(), backend = relay.backend(), "relay attached");

        let store = self.clone();
        let cancel = self.inner.cancel.clone();
        self.inner.drivers.spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    next = inbox.next() => match next {
                        Some(envelope) => {
                            store.apply_remote(&envelope).await;
                        }
                        None => break,
                    },
                }
            }
            debug!("relay driver stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTransport, store_with};
    use chatdesk_core::{Priority, Sender, VisitorInfo};
    use chatdesk_core::{ChatTransport, SnapshotStore};
    use chatdesk_relay::{BroadcastHub, BroadcastSync, SyncRelay};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn tab(hub: &Arc<BroadcastHub>, id: &str) -> SessionStore {
        let relay = SyncRelay::with_tab_id(Arc::new(BroadcastSync::new(hub, "chatdesk-sync")), id);
        SessionStore::builder(FakeTransport::offline())
            .relay(Arc::new(relay))
            .build()
    }

    async fn eventually(mut check: impl FnMut() -> bool) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn transport_events_reach_the_store() {
        let (store, transport) = store_with(FakeTransport::online());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        store.attach_transport();
        store.attach_transport();
        assert_eq!(transport.handlers(EventKind::NewMessage), 1);

        transport.inject(TransportEvent::NewMessage {
            session_id: id.clone(),
            message: Message::new(&id, "is the 20kVA in stock?", Sender::Visitor, vec![]),
        });
        eventually(|| store.session(&id).is_some_and(|s| s.unread_count == 1)).await;

        store.shutdown().await;
        assert_eq!(transport.handlers(EventKind::NewMessage), 0);
    }

    #[tokio::test]
    async fn remote_snapshot_applies_without_rebroadcast() {
        let hub = Arc::new(BroadcastHub::new());
        let a = tab(&hub, "a");
        let b = tab(&hub, "b");
        let id = a.create_session(VisitorInfo::named("Ahmad")).await;
        b.attach_relay().await;

        // Watch the channel for anything B sends.
        let mut watcher = hub.channel("chatdesk-sync").subscribe();

        a.set_priority(&id, Priority::Urgent).await.unwrap();
        eventually(|| b.session(&id).is_some_and(|s| s.priority == Priority::Urgent)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let mut from_b = 0;
        while let Ok(env) = watcher.try_recv() {
            if env.source == "b" {
                from_b += 1;
            }
        }
        assert_eq!(from_b, 0, "applying a remote snapshot must not rebroadcast");
        assert!(!b.relay().unwrap().is_suppressed());

        b.shutdown().await;
    }

    #[tokio::test]
    async fn foreign_envelopes_are_ignored() {
        let (store, _) = store_with(FakeTransport::offline());
        store.create_session(VisitorInfo::named("Ahmad")).await;

        let other = RelayEnvelope {
            kind: "CHAT_NOTIFICATIONS_UPDATED".into(),
            payload: serde_json::json!([]),
            source: "x".into(),
        };
        assert!(!store.apply_remote(&other).await);

        let garbage = RelayEnvelope {
            kind: SESSIONS_UPDATED.into(),
            payload: serde_json::json!("not a snapshot"),
            source: "x".into(),
        };
        assert!(!store.apply_remote(&garbage).await);
        assert_eq!(store.sessions().len(), 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn damaged_snapshot_leaves_state_and_storage_alone() {
        let snapshots: Arc<dyn SnapshotStore> = Arc::new(
            chatdesk_storage::SqliteSnapshotStore::new(chatdesk_config::StorageConfig {
                database_path: ":memory:".into(),
                ..Default::default()
            }),
        );
        snapshots.initialize().await.unwrap();
        let store = SessionStore::builder(FakeTransport::offline())
            .persistence(Arc::clone(&snapshots), "chat_sessions")
            .build();
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        let persisted = snapshots.get("chat_sessions").await.unwrap();

        for payload in [
            serde_json::json!([42, "junk"]),
            serde_json::json!({"schemaVersion": 1, "sessions": [{"visitorName": "no id"}]}),
        ] {
            let damaged = RelayEnvelope {
                kind: SESSIONS_UPDATED.into(),
                payload,
                source: "x".into(),
            };
            assert!(!store.apply_remote(&damaged).await);
        }

        assert_eq!(store.sessions().len(), 1);
        assert!(store.session(&id).is_some());
        assert_eq!(snapshots.get("chat_sessions").await.unwrap(), persisted);
        assert!(logs_contain("rejected relay snapshot"));
    }

    #[tokio::test]
    async fn remote_snapshot_releases_closed_and_removed_sessions() {
        let (store, transport) = store_with(FakeTransport::offline());
        let kept = store.create_session(VisitorInfo::named("Ahmad")).await;
        let gone = store.create_session(VisitorInfo::named("Sara")).await;
        transport.track_session(&kept);
        transport.track_session(&gone);

        let mut remote = store.session(&kept).unwrap();
        remote.status = chatdesk_core::SessionStatus::Closed;
        let envelope = RelayEnvelope {
            kind: SESSIONS_UPDATED.into(),
            payload: serde_json::json!({"schemaVersion": 1, "sessions": [remote]}),
            source: "x".into(),
        };
        assert!(store.apply_remote(&envelope).await);
        assert!(transport.fed().is_empty());
    }

    #[tokio::test]
    async fn remote_snapshot_drops_stale_selection() {
        let (store, _) = store_with(FakeTransport::offline());
        let id = store.create_session(VisitorInfo::named("Ahmad")).await;
        store.set_active_session(Some(&id)).unwrap();

        let empty = RelayEnvelope {
            kind: SESSIONS_UPDATED.into(),
            payload: serde_json::json!({"schemaVersion": 1, "sessions": []}),
            source: "x".into(),
        };
        assert!(store.apply_remote(&empty).await);
        assert!(store.sessions().is_empty());
        assert!(store.active_session().is_none());
    }
}
