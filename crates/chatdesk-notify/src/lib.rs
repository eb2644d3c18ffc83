// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification engine for chatdesk.
//!
//! Turns session lifecycle events into notification records and fires the
//! desktop alert and chime for the two alerting kinds.

pub mod chime;
pub mod desktop;
pub mod engine;

pub use chime::{SynthChime, synthesize_chime};
pub use desktop::SystemDesktopNotifier;
pub use engine::NotificationEngine;
