// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named in-process broadcast channels.

use chatdesk_core::RelayEnvelope;
use dashmap::DashMap;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Registry of named broadcast channels shared by the instances of one
/// process. Every instance that opens the same name sees every envelope
/// published on it, including its own.
#[derive(Debug, Default)]
pub struct BroadcastHub {
    channels: DashMap<String, broadcast::Sender<RelayEnvelope>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sender for `name`, creating the channel on first use.
    pub fn channel(&self, name: &str) -> broadcast::Sender<RelayEnvelope> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Number of open receivers on `name`.
    pub fn listeners(&self, name: &str) -> usize {
        self.channels
            .get(name)
            .map_or(0, |tx| tx.receiver_count())
    }
}
