// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the chatdesk live chat coordinator.
//!
//! This crate provides the data model, the error taxonomy, the transport
//! event emitter, and the adapter traits that the transport, relay, storage
//! and notification crates implement.

pub mod error;
pub mod events;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ChatdeskError;
pub use events::{EventEmitter, EventHandler, HandlerId};
pub use types::{
    AdapterType, AssignedAdmin, Attachment, ChatSession, DeliveryAck, EventKind, HealthStatus,
    Message, OutboundDelivery, RemoteSession,
    MessageStatus, Notification, NotificationKind, NotificationPermission, Priority,
    RelayEnvelope, Sender, SessionStats, SessionStatus, TransportEvent, VisitorInfo,
};

pub use traits::{
    ChatTransport, ChimePlayer, DesktopNotifier, PluginAdapter, SnapshotStore, StateSync,
};
