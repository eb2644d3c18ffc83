// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` implements `ChatTransport` with captured outbound
//! deliveries, injectable inbound events, and a switch that makes every
//! remote call fail.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use chatdesk_core::{
    AdapterType, ChatTransport, ChatdeskError, DeliveryAck, EventEmitter, EventHandler, EventKind,
    HandlerId, HealthStatus, Message, OutboundDelivery, PluginAdapter, RemoteSession,
    TransportEvent, VisitorInfo,
};

/// A mock chat backend for testing.
pub struct MockTransport {
    fail_all: AtomicBool,
    connected: AtomicBool,
    allocated: AtomicUsize,
    sent: Mutex<Vec<OutboundDelivery>>,
    events: EventEmitter,
}

impl MockTransport {
    /// A mock whose remote calls succeed.
    pub fn new() -> Self {
        Self {
            fail_all: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            allocated: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            events: EventEmitter::new(),
        }
    }

    /// A mock whose remote calls all fail.
    pub fn failing() -> Self {
        let mock = Self::new();
        mock.set_fail_all(true);
        mock
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    fn failing_now(&self) -> bool {
        self.fail_all.load(Ordering::SeqCst)
    }

    /// Deliveries that reached the mock backend.
    pub fn sent_messages(&self) -> Vec<OutboundDelivery> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Number of session ids handed out.
    pub fn allocated_count(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    /// Emit an event to subscribers as if it arrived on the stream.
    pub fn inject(&self, event: TransportEvent) {
        self.events.emit(&event);
    }

    /// Emit a `new_message` event.
    pub fn inject_message(&self, session_id: &str, message: Message) {
        self.inject(TransportEvent::NewMessage {
            session_id: session_id.to_string(),
            message,
        });
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.events.handler_count(kind)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        if self.failing_now() {
            Ok(HealthStatus::Degraded("failing all calls".into()))
        } else {
            Ok(HealthStatus::Healthy)
        }
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn connect(&self) -> Result<(), ChatdeskError> {
        if self.failing_now() {
            return Err(ChatdeskError::Transport {
                message: "mock connect refused".into(),
                source: None,
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        self.events.emit(&TransportEvent::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ChatdeskError> {
        self.connected.store(false, Ordering::SeqCst);
        self.events.emit(&TransportEvent::Disconnected {
            reason: "disconnect requested".into(),
            terminal: true,
        });
        Ok(())
    }

    async fn send_message(&self, payload: &OutboundDelivery) -> Result<DeliveryAck, ChatdeskError> {
        if self.failing_now() {
            return Err(ChatdeskError::Delivery {
                message: "mock delivery refused".into(),
            });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(payload.clone());
        Ok(DeliveryAck(serde_json::json!({ "ok": true })))
    }

    async fn create_session(&self, _visitor: &VisitorInfo) -> Result<RemoteSession, ChatdeskError> {
        if self.failing_now() {
            return Err(ChatdeskError::Transport {
                message: "mock allocation refused".into(),
                source: None,
            });
        }
        let n = self.allocated.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RemoteSession {
            id: format!("mock-{n}"),
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
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_core::Sender;

    #[tokio::test]
    async fn fail_switch_affects_remote_calls() {
        let mock = MockTransport::new();
        let payload = OutboundDelivery::from(&Message::new("s", "hi", Sender::Admin, vec![]));
        assert!(mock.send_message(&payload).await.is_ok());
        assert_eq!(mock.create_session(&VisitorInfo::named("a")).await.unwrap().id, "mock-1");

        mock.set_fail_all(true);
        assert!(mock.send_message(&payload).await.is_err());
        assert!(mock.create_session(&VisitorInfo::named("a")).await.is_err());
        assert_eq!(mock.sent_count(), 1);
    }
}
