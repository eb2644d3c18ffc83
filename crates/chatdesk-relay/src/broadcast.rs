// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State sync over a named in-process broadcast channel.

use std::sync::Arc;

use async_trait::async_trait;
use chatdesk_core::{
    AdapterType, ChatdeskError, HealthStatus, PluginAdapter, RelayEnvelope, StateSync,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::hub::BroadcastHub;

const FORWARD_CAPACITY: usize = 64;

pub struct BroadcastSync {
    channel_name: String,
    sender: broadcast::Sender<RelayEnvelope>,
}

impl BroadcastSync {
    pub fn new(hub: &Arc<BroadcastHub>, channel_name: &str) -> Self {
        Self {
            channel_name: channel_name.to_string(),
            sender: hub.channel(channel_name),
        }
    }
}

#[async_trait]
impl PluginAdapter for BroadcastSync {
    fn name(&self) -> &str {
        "broadcast"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Relay
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl StateSync for BroadcastSync {
    async fn publish(&self, envelope: &RelayEnvelope) -> Result<(), ChatdeskError> {
        // A send error only means nobody is listening yet.
        if self.sender.send(envelope.clone()).is_err() {
            debug!(channel = %self.channel_name, "no listeners for broadcast");
        }
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<RelayEnvelope>, ChatdeskError> {
        let mut rx = self.sender.subscribe();
        let (tx, out) = mpsc::channel(FORWARD_CAPACITY);
        let channel = self.channel_name.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(envelope) => {
                        if tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%channel, skipped, "relay subscriber lagged, snapshots dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(out)
    }
}
