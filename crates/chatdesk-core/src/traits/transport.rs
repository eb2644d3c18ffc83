// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait: the live connection to the remote chat backend.

use async_trait::async_trait;

use crate::error::ChatdeskError;
use crate::events::{EventHandler, HandlerId};
use crate::traits::adapter::PluginAdapter;
use crate::types::{DeliveryAck, EventKind, OutboundDelivery, RemoteSession, VisitorInfo};

/// One long-lived inbound event stream plus outbound request primitives.
///
/// Real and simulated implementations emit the same events, so consumers
/// cannot tell them apart.
#[async_trait]
pub trait ChatTransport: PluginAdapter {
    /// Open the inbound stream, tearing down any existing one first.
    async fn connect(&self) -> Result<(), ChatdeskError>;

    /// Close the inbound stream. Always emits `disconnected`.
    async fn disconnect(&self) -> Result<(), ChatdeskError>;

    /// Deliver a chat message to the remote party. No retry.
    async fn send_message(&self, payload: &OutboundDelivery)
        -> Result<DeliveryAck, ChatdeskError>;

    /// Ask the remote party to allocate a session id.
    async fn create_session(&self, visitor: &VisitorInfo)
        -> Result<RemoteSession, ChatdeskError>;

    /// Subscribe to an event kind.
    fn on(&self, kind: EventKind, handler: EventHandler) -> HandlerId;

    /// Unsubscribe a handler. Returns false if it was not registered.
    fn off(&self, kind: EventKind, id: HandlerId) -> bool;

    /// Whether the inbound stream is currently open.
    fn is_connected(&self) -> bool;

    /// Include an open session in traffic the transport generates itself.
    /// Backends that push their own events ignore this.
    fn track_session(&self, _session_id: &str) {}

    /// Stop generated traffic for a session that was closed, archived or
    /// deleted.
    fn release_session(&self, _session_id: &str) {}
}
