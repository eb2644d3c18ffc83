// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State sync transport trait for propagating snapshots between instances.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ChatdeskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::RelayEnvelope;

/// A channel that carries [`RelayEnvelope`]s between running instances.
///
/// Implementations are best-effort: delivery order is arrival order on the
/// channel and nothing is acknowledged.
#[async_trait]
pub trait StateSync: PluginAdapter {
    /// Broadcast an envelope to every other participant.
    async fn publish(&self, envelope: &RelayEnvelope) -> Result<(), ChatdeskError>;

    /// Start receiving envelopes published by other participants.
    async fn subscribe(&self) -> Result<mpsc::Receiver<RelayEnvelope>, ChatdeskError>;
}
