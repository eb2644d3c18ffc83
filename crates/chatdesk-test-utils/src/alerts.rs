// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording alert sinks.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chatdesk_core::{ChatdeskError, ChimePlayer, DesktopNotifier, NotificationPermission};

/// Desktop notifier that records what it was asked to show.
///
/// `answer` is the permission state returned when a request is made.
pub struct RecordingDesktopNotifier {
    permission: Mutex<NotificationPermission>,
    answer: NotificationPermission,
    requests: AtomicUsize,
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingDesktopNotifier {
    pub fn new(initial: NotificationPermission, answer: NotificationPermission) -> Self {
        Self {
            permission: Mutex::new(initial),
            answer,
            requests: AtomicUsize::new(0),
            shown: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(NotificationPermission::Granted, NotificationPermission::Granted)
    }

    pub fn denied() -> Self {
        Self::new(NotificationPermission::Denied, NotificationPermission::Denied)
    }

    /// (title, body) pairs shown so far.
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DesktopNotifier for RecordingDesktopNotifier {
    fn permission(&self) -> NotificationPermission {
        *self.permission.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn request_permission(&self) -> NotificationPermission {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.permission.lock().unwrap_or_else(|e| e.into_inner()) = self.answer;
        self.answer
    }

    async fn show(&self, title: &str, body: &str) -> Result<(), ChatdeskError> {
        self.shown
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Chime that counts how often it played.
#[derive(Default)]
pub struct RecordingChime {
    plays: AtomicUsize,
}

impl RecordingChime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChimePlayer for RecordingChime {
    async fn play(&self) -> Result<(), ChatdeskError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
