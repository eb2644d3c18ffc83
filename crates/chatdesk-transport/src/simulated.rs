// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline stand-in for the chat backend.
//!
//! Allocates session ids locally, acknowledges every delivery and, while
//! connected, periodically synthesizes visitor messages for the sessions it
//! knows about. Events have exactly the shape of the HTTP path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chatdesk_core::types::{DeliveryAck, OutboundDelivery, RemoteSession, VisitorInfo};
use chatdesk_core::{Message, Sender, SessionStatus, TransportEvent};
use chrono::Utc;

const VISITOR_LINES: &[&str] = &[
    "Hello, I need a quote for a 20 kVA diesel generator.",
    "Do you handle installation as well?",
    "What is the warranty on the silent series?",
    "Is the 100 kVA model in stock?",
    "Can someone call me back this afternoon?",
    "How much fuel does it use at half load?",
    "Do you offer maintenance contracts?",
];

/// Local session allocator and message synthesizer.
#[derive(Debug, Default)]
pub struct SimulatedFeed {
    sessions: Mutex<Vec<String>>,
    cursor: AtomicUsize,
}

impl SimulatedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id the way the backend would and start feeding it.
    pub fn allocate(&self, _visitor: &VisitorInfo) -> RemoteSession {
        let id = format!("sim-{}", uuid::Uuid::new_v4());
        self.track(&id);
        RemoteSession {
            id,
            status: Some(SessionStatus::Active),
            created_at: Some(Utc::now()),
        }
    }

    /// Add an existing session to the synthesized traffic.
    pub fn track(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if !sessions.iter().any(|s| s == session_id) {
            sessions.push(session_id.to_string());
        }
    }

    /// Stop synthesizing traffic for a session.
    pub fn forget(&self, session_id: &str) {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|s| s != session_id);
    }

    pub fn tracked(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Acknowledge a delivery.
    pub fn ack(&self, payload: &OutboundDelivery) -> DeliveryAck {
        DeliveryAck(serde_json::json!({
            "ok": true,
            "sessionId": payload.session_id,
            "simulated": true,
        }))
    }

    /// Next synthesized visitor message, round-robin over tracked sessions.
    pub fn next_event(&self) -> Option<TransportEvent> {
        let session_id = {
            let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            if sessions.is_empty() {
                return None;
            }
            let tick = self.cursor.load(Ordering::Relaxed);
            sessions[tick % sessions.len()].clone()
        };
        let tick = self.cursor.fetch_add(1, Ordering::Relaxed);
        let text = VISITOR_LINES[tick % VISITOR_LINES.len()];
        let message = Message::new(&session_id, text, Sender::Visitor, vec![]);
        Some(TransportEvent::NewMessage {
            session_id,
            message,
        })
    }
}
