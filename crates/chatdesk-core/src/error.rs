// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the chatdesk coordinator.
//!
//! Auxiliary failures (transport, relay, desktop notifications) are contained
//! where they happen and only logged. Integrity failures such as a missing
//! session propagate to the caller as [`ChatdeskError::NotFound`].

use thiserror::Error;

/// The primary error type used across all chatdesk crates.
#[derive(Debug, Error)]
pub enum ChatdeskError {
    /// Configuration errors (invalid values, unusable endpoints).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable storage errors (database open, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Inbound stream or remote request failure.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A chat message could not be delivered to the remote party.
    #[error("delivery failed: {message}")]
    Delivery { message: String },

    /// A record failed validation (missing identity fields and the like).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The referenced session, message, or notification does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Desktop notification permission was refused.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Cross-instance relay failure (channel closed, socket error).
    #[error("relay error: {message}")]
    Relay {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// JSON (de)serialization failure.
    #[error("serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatdeskError {
    /// Shorthand for a missing session.
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "session",
            id: id.into(),
        }
    }

    /// Shorthand for a missing message.
    pub fn message_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "message",
            id: id.into(),
        }
    }

    /// Returns true for errors that only affect auxiliary features and are
    /// expected to be swallowed at their origin.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Delivery { .. }
                | Self::Relay { .. }
                | Self::PermissionDenied(_)
                | Self::Timeout { .. }
        )
    }
}
