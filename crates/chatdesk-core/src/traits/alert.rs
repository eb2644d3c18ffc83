// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External alert sinks driven by the notification engine.

use async_trait::async_trait;

use crate::error::ChatdeskError;
use crate::types::NotificationPermission;

/// Desktop notification sink, gated on a permission state.
#[async_trait]
pub trait DesktopNotifier: Send + Sync {
    /// Current permission state, without prompting.
    fn permission(&self) -> NotificationPermission;

    /// Prompt for permission. Returns the resulting state.
    async fn request_permission(&self) -> NotificationPermission;

    /// Show a notification. Callers treat every error as non-fatal.
    async fn show(&self, title: &str, body: &str) -> Result<(), ChatdeskError>;
}

/// Audible alert sink.
#[async_trait]
pub trait ChimePlayer: Send + Sync {
    /// Play the alert chime. Callers treat every error as non-fatal.
    async fn play(&self) -> Result<(), ChatdeskError>;
}
