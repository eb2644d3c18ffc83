// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-instance operation: publishes go nowhere, nothing arrives.

use async_trait::async_trait;
use chatdesk_core::{
    AdapterType, ChatdeskError, HealthStatus, PluginAdapter, RelayEnvelope, StateSync,
};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
pub struct NoSync;

#[async_trait]
impl PluginAdapter for NoSync {
    fn name(&self) -> &str {
        "none"
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
impl StateSync for NoSync {
    async fn publish(&self, _envelope: &RelayEnvelope) -> Result<(), ChatdeskError> {
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<RelayEnvelope>, ChatdeskError> {
        // The sender is dropped here, so the receiver yields None at once.
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }
}
