// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-crate fakes for store unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatdesk_core::{
    AdapterType, ChatTransport, ChatdeskError, DeliveryAck, EventEmitter, EventHandler, EventKind,
    HandlerId, HealthStatus, OutboundDelivery, PluginAdapter, RemoteSession, TransportEvent,
    VisitorInfo,
};

use crate::SessionStore;

pub(crate) struct FakeTransport {
    online: bool,
    sent: Mutex<Vec<OutboundDelivery>>,
    /// Sessions currently fed by the transport, in tracking order.
    fed: Mutex<Vec<String>>,
    events: EventEmitter,
}

impl FakeTransport {
    fn with_online(online: bool) -> Arc<Self> {
        Arc::new(Self {
            online,
            sent: Mutex::new(Vec::new()),
            fed: Mutex::new(Vec::new()),
            events: EventEmitter::new(),
        })
    }

    pub(crate) fn online() -> Arc<Self> {
        Self::with_online(true)
    }

    pub(crate) fn offline() -> Arc<Self> {
        Self::with_online(false)
    }

    pub(crate) fn fed(&self) -> Vec<String> {
        self.fed.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<OutboundDelivery> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn inject(&self, event: TransportEvent) {
        self.events.emit(&event);
    }

    pub(crate) fn handlers(&self, kind: EventKind) -> usize {
        self.events.handler_count(kind)
    }
}

#[async_trait]
impl PluginAdapter for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }
    fn version(&self) -> semver::Version {
        semver::Version::new(0, 0, 0)
    }
    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }
    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(HealthStatus::Healthy)
    }
    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn connect(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
    async fn disconnect(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
    async fn send_message(&self, payload: &OutboundDelivery) -> Result<DeliveryAck, ChatdeskError> {
        if !self.online {
            return Err(ChatdeskError::Delivery {
                message: "offline".into(),
            });
        }
        self.sent.lock().unwrap().push(payload.clone());
        Ok(DeliveryAck(serde_json::json!({"ok": true})))
    }
    async fn create_session(&self, _visitor: &VisitorInfo) -> Result<RemoteSession, ChatdeskError> {
        if !self.online {
            return Err(ChatdeskError::Transport {
                message: "offline".into(),
                source: None,
            });
        }
        Ok(RemoteSession {
            id: format!("remote-{}", uuid::Uuid::new_v4()),
            status: None,
            created_at: None,
        })
    }
    fn on(&self, kind: EventKind, handler: EventHandler) -> HandlerId {
        self.events.on(kind, handler)
    }
    fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.events.off(kind, id)
    }
    fn is_connected(&self) -> bool {
        self.online
    }
    fn track_session(&self, session_id: &str) {
        let mut fed = self.fed.lock().unwrap();
        if !fed.iter().any(|s| s == session_id) {
            fed.push(session_id.to_string());
        }
    }
    fn release_session(&self, session_id: &str) {
        self.fed.lock().unwrap().retain(|s| s != session_id);
    }
}

pub(crate) fn store_with(transport: Arc<FakeTransport>) -> (SessionStore, Arc<FakeTransport>) {
    let store = SessionStore::builder(transport.clone()).build();
    (store, transport)
}
