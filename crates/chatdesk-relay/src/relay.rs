// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-instance relay endpoint: tab identity, echo guard and the one-shot
//! suppression flag used while applying a remote snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chatdesk_core::{RelayEnvelope, StateSync};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Envelope type carrying the full session list.
pub const SESSIONS_UPDATED: &str = "CHAT_SESSIONS_UPDATED";

pub struct SyncRelay {
    tab_id: String,
    sync: Arc<dyn StateSync>,
    suppressed: AtomicBool,
}

impl SyncRelay {
    /// Wrap `sync` with a fresh random tab id.
    pub fn new(sync: Arc<dyn StateSync>) -> Self {
        Self::with_tab_id(sync, format!("tab-{}", uuid::Uuid::new_v4()))
    }

    pub fn with_tab_id(sync: Arc<dyn StateSync>, tab_id: impl Into<String>) -> Self {
        Self {
            tab_id: tab_id.into(),
            sync,
            suppressed: AtomicBool::new(false),
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    /// Name of the underlying sync implementation.
    pub fn backend(&self) -> &str {
        self.sync.name()
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::SeqCst)
    }

    /// Set the suppression flag until the returned guard is dropped.
    pub fn suppress(&self) -> SuppressGuard<'_> {
        self.suppressed.store(true, Ordering::SeqCst);
        SuppressGuard { relay: self }
    }

    /// Broadcast a full snapshot. Skipped while suppressed. Failures are
    /// logged and reported as `false`.
    pub async fn publish(&self, kind: &str, payload: serde_json::Value) -> bool {
        if self.is_suppressed() {
            debug!(kind, "broadcast suppressed while applying a remote snapshot");
            return false;
        }
        let envelope = RelayEnvelope {
            kind: kind.to_string(),
            payload,
            source: self.tab_id.clone(),
        };
        match self.sync.publish(&envelope).await {
            Ok(()) => true,
            Err(e) => {
                warn!(kind, error = %e, "relay publish failed");
                false
            }
        }
    }

    /// Start receiving envelopes from other instances. A failure yields an
    /// inbox that never produces anything.
    pub async fn inbox(&self) -> RelayInbox {
        let rx = match self.sync.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "relay subscribe failed, running single-instance");
                mpsc::channel(1).1
            }
        };
        RelayInbox {
            tab_id: self.tab_id.clone(),
            rx,
        }
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.sync.shutdown().await {
            warn!(error = %e, "relay shutdown failed");
        }
    }
}

impl std::fmt::Debug for SyncRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRelay")
            .field("tab_id", &self.tab_id)
            .field("backend", &self.sync.name())
            .field("suppressed", &self.is_suppressed())
            .finish()
    }
}

/// Clears the suppression flag on drop.
#[must_use = "suppression ends when the guard is dropped"]
pub struct SuppressGuard<'a> {
    relay: &'a SyncRelay,
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.relay.suppressed.store(false, Ordering::SeqCst);
    }
}

/// Inbound envelopes with this instance's own echoes removed.
pub struct RelayInbox {
    tab_id: String,
    rx: mpsc::Receiver<RelayEnvelope>,
}

impl RelayInbox {
    /// Next envelope from another instance, or `None` once the channel closes.
    pub async fn next(&mut self) -> Option<RelayEnvelope> {
        while let Some(envelope) = self.rx.recv().await {
            if envelope.source == self.tab_id {
                debug!(kind = %envelope.kind, "discarding own echo");
                continue;
            }
            return Some(envelope);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BroadcastHub, BroadcastSync, NoSync};
    use std::time::Duration;

    fn pair() -> (SyncRelay, SyncRelay) {
        let hub = Arc::new(BroadcastHub::new());
        let a = SyncRelay::with_tab_id(Arc::new(BroadcastSync::new(&hub, "chatdesk-sync")), "a");
        let b = SyncRelay::with_tab_id(Arc::new(BroadcastSync::new(&hub, "chatdesk-sync")), "b");
        (a, b)
    }

    #[tokio::test]
    async fn envelope_reaches_the_other_instance_only() {
        let (a, b) = pair();
        let mut inbox_a = a.inbox().await;
        let mut inbox_b = b.inbox().await;

        assert!(a.publish(SESSIONS_UPDATED, serde_json::json!([1])).await);

        let got = inbox_b.next().await.unwrap();
        assert_eq!(got.kind, SESSIONS_UPDATED);
        assert_eq!(got.source, "a");
        assert_eq!(got.payload, serde_json::json!([1]));

        // A sees its own envelope on the shared channel and drops it.
        let echo = tokio::time::timeout(Duration::from_millis(50), inbox_a.next()).await;
        assert!(echo.is_err(), "own echo must be discarded");
    }

    #[tokio::test]
    async fn suppression_is_scoped_to_the_guard() {
        let (a, b) = pair();
        let mut inbox_b = b.inbox().await;
        {
            let _guard = a.suppress();
            assert!(a.is_suppressed());
            assert!(!a.publish(SESSIONS_UPDATED, serde_json::json!([])).await);
        }
        assert!(!a.is_suppressed());
        assert!(a.publish(SESSIONS_UPDATED, serde_json::json!(["after"])).await);
        assert_eq!(
            inbox_b.next().await.unwrap().payload,
            serde_json::json!(["after"])
        );
    }

    #[tokio::test]
    async fn no_sync_inbox_ends_immediately() {
        let relay = SyncRelay::new(Arc::new(NoSync));
        assert!(relay.tab_id().starts_with("tab-"));
        assert!(relay.publish(SESSIONS_UPDATED, serde_json::json!([])).await);
        assert!(relay.inbox().await.next().await.is_none());
    }
}
