// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Desktop notification sink.
//!
//! With the `desktop-notifications` feature alerts go through the platform
//! notification service via `notify-rust`. Without it they are written to
//! the log at info level.

use std::sync::Mutex;

use async_trait::async_trait;
use chatdesk_core::{ChatdeskError, DesktopNotifier, NotificationPermission};
#[cfg(not(feature = "desktop-notifications"))]
use tracing::info;
use tracing::debug;

pub struct SystemDesktopNotifier {
    app_name: String,
    permission: Mutex<NotificationPermission>,
}

impl SystemDesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            permission: Mutex::new(NotificationPermission::Default),
        }
    }

    fn set_permission(&self, value: NotificationPermission) {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }
}

#[async_trait]
impl DesktopNotifier for SystemDesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_permission(&self) -> NotificationPermission {
        // The platform services have no consent prompt; asking only checks
        // that one is reachable.
        let granted = service_available().await;
        let state = if granted {
            NotificationPermission::Granted
        } else {
            NotificationPermission::Denied
        };
        debug!(permission = %state, "desktop notification permission resolved");
        self.set_permission(state);
        state
    }

    async fn show(&self, title: &str, body: &str) -> Result<(), ChatdeskError> {
        show_platform(&self.app_name, title, body).await
    }
}

#[cfg(all(feature = "desktop-notifications", all(unix, not(target_os = "macos"))))]
async fn service_available() -> bool {
    tokio::task::spawn_blocking(|| notify_rust::get_server_information().is_ok())
        .await
        .unwrap_or(false)
}

#[cfg(not(all(feature = "desktop-notifications", all(unix, not(target_os = "macos")))))]
async fn service_available() -> bool {
    true
}

#[cfg(feature = "desktop-notifications")]
async fn show_platform(app_name: &str, title: &str, body: &str) -> Result<(), ChatdeskError> {
    let (app_name, title, body) = (app_name.to_string(), title.to_string(), body.to_string());
    tokio::task::spawn_blocking(move || {
        notify_rust::Notification::new()
            .appname(&app_name)
            .summary(&title)
            .body(&body)
            .show()
            .map(|_| ())
            .map_err(|e| ChatdeskError::Internal(format!("desktop notification failed: {e}")))
    })
    .await
    .map_err(|e| ChatdeskError::Internal(format!("desktop notification task failed: {e}")))?
}

#[cfg(not(feature = "desktop-notifications"))]
async fn show_platform(app_name: &str, title: &str, body: &str) -> Result<(), ChatdeskError> {
    info!(app = app_name, title, body, "desktop notification");
    Ok(())
}
