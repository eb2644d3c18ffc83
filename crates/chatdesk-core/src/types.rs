// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by every chatdesk crate.
//!
//! Field names serialize in camelCase so persisted snapshots, relay payloads
//! and wire events keep the shapes the browser admin already produces. Every
//! field outside the identity fields carries a serde default so records
//! written by earlier schema iterations still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a chat session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Waiting,
    Closed,
    Archived,
}

/// Administrative priority of a chat session.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Author of a chat message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    #[default]
    Visitor,
    Admin,
}

/// Delivery status of a message.
///
/// Variants are declared in lifecycle order; a status only ever moves
/// forward (`Sent < Delivered < Read`).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    #[default]
    Sent,
    Delivered,
    Read,
}

/// Kind of a derived notification record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    NewSession,
    NewMessage,
    SessionClosed,
    AdminAssigned,
    PriorityChanged,
}

/// A file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One unit of chat communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub sender: Sender,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub status: MessageStatus,
    /// Back-reference to the owning session (lookup only).
    #[serde(default)]
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// Create a fresh message in `sent` status with a random id.
    pub fn new(
        session_id: impl Into<String>,
        text: impl Into<String>,
        sender: Sender,
        attachments: Vec<Attachment>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
            status: MessageStatus::Sent,
            session_id: session_id.into(),
            attachments,
        }
    }
}

/// The admin that owns a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedAdmin {
    pub id: String,
    pub name: String,
}

/// Visitor-supplied identity and context, also the body of the outbound
/// session-creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl VisitorInfo {
    /// Visitor info carrying only a display name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A single visitor's conversation with the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    #[serde(default)]
    pub visitor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visitor_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_admin: Option<AssignedAdmin>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub last_activity: DateTime<Utc>,
    /// Cached text of the final message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
}

impl ChatSession {
    /// A new `active` session with no messages.
    pub fn new(id: impl Into<String>, visitor: &VisitorInfo, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            visitor_name: visitor.name.clone(),
            visitor_email: visitor.email.clone(),
            visitor_phone: visitor.phone.clone(),
            ip_address: visitor.ip_address.clone(),
            user_agent: visitor.user_agent.clone(),
            page_url: visitor.page_url.clone(),
            department: visitor.department.clone(),
            status: SessionStatus::Active,
            priority: Priority::default(),
            messages: Vec::new(),
            unread_count: 0,
            assigned_admin: None,
            tags: Vec::new(),
            created_at,
            updated_at: created_at,
            last_activity: created_at,
            last_message: None,
        }
    }

    /// Refresh `updated_at` and `last_activity`.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.last_activity = now;
    }

    /// Re-derive the cached fields after a message splice or edit.
    ///
    /// Keeps `last_message` equal to the final message text and clamps
    /// `unread_count` to the number of messages.
    pub fn reconcile(&mut self) {
        self.last_message = self.messages.last().map(|m| m.text.clone());
        let len = u32::try_from(self.messages.len()).unwrap_or(u32::MAX);
        self.unread_count = self.unread_count.min(len);
    }

    /// Find a message by id.
    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    /// Returns true if the session carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// A derived alert record produced by the notification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// Weak reference to the session, lookup only.
    pub session_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// Create an unread notification.
    pub fn new(
        kind: NotificationKind,
        session_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            session_id: session_id.into(),
            title: title.into(),
            body: body.into(),
            timestamp: Utc::now(),
            read: false,
        }
    }
}

/// Counts by status plus total unread, a pure derived read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub total: usize,
    pub active: usize,
    pub waiting: usize,
    pub closed: usize,
    pub archived: usize,
    pub total_unread: u64,
}

/// Body of the outbound delivery request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundDelivery {
    pub text: String,
    pub session_id: String,
    pub sender: Sender,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl From<&Message> for OutboundDelivery {
    fn from(message: &Message) -> Self {
        Self {
            text: message.text.clone(),
            session_id: message.session_id.clone(),
            sender: message.sender,
            attachments: message.attachments.clone(),
        }
    }
}

/// Opaque acknowledgment returned by a successful delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAck(pub serde_json::Value);

/// Response to a remote session-allocation request.
///
/// Echoed visitor fields are ignored; only the allocated id matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSession {
    pub id: String,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Event kinds emitted by a transport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Connected,
    Disconnected,
    NewMessage,
    Reconnecting,
}

/// An event emitted by a transport to its subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The inbound stream is open.
    Connected,
    /// The inbound stream ended. `terminal` is set once reconnection gave up
    /// or after an explicit disconnect.
    Disconnected { reason: String, terminal: bool },
    /// A chat message arrived for a session.
    NewMessage { session_id: String, message: Message },
    /// A reconnect attempt is scheduled.
    Reconnecting { attempt: u32, delay_ms: u64 },
}

impl TransportEvent {
    /// The subscription kind this event is dispatched under.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::NewMessage { .. } => EventKind::NewMessage,
            Self::Reconnecting { .. } => EventKind::Reconnecting,
        }
    }
}

/// Inbound wire event: `{ "type": "new_message", "sessionId", "message" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    #[serde(rename_all = "camelCase")]
    NewMessage { session_id: String, message: Message },
}

/// Cross-instance broadcast message.
///
/// `kind` serializes as `type` and follows the `<DOMAIN>_UPDATED` naming;
/// `payload` is a full state snapshot; `source` is the sending instance id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
    pub source: String,
}

/// Desktop notification permission state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationPermission {
    /// Not asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Relay,
    Storage,
}
