// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State sync through the shared snapshot database.
//!
//! Every instance pointed at the same database file writes its latest
//! envelope under one well-known key and polls that key for changes. This
//! links separate processes without a relay server. Only the newest
//! envelope is kept, which is all last-writer-wins needs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chatdesk_core::{
    AdapterType, ChatdeskError, HealthStatus, PluginAdapter, RelayEnvelope, SnapshotStore,
    StateSync,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const FORWARD_CAPACITY: usize = 8;

pub struct StorageSync {
    store: Arc<dyn SnapshotStore>,
    key: String,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl StorageSync {
    /// `store` must already be initialized.
    pub fn new(store: Arc<dyn SnapshotStore>, channel_name: &str, poll_interval: Duration) -> Self {
        Self {
            store,
            key: format!("relay:{channel_name}"),
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Storage key the envelopes are written under.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl PluginAdapter for StorageSync {
    fn name(&self) -> &str {
        "storage"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Relay
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        self.store.health_check().await
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        self.cancel.cancel();
        Ok(())
    }
}

#[async_trait]
impl StateSync for StorageSync {
    async fn publish(&self, envelope: &RelayEnvelope) -> Result<(), ChatdeskError> {
        let raw = serde_json::to_string(envelope).map_err(|e| ChatdeskError::Relay {
            message: "failed to encode envelope".into(),
            source: Some(Box::new(e)),
        })?;
        self.store.put(&self.key, raw).await
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<RelayEnvelope>, ChatdeskError> {
        // Whatever is stored now predates this instance and is not replayed.
        let mut last = self.store.get(&self.key).await?;
        let (tx, out) = mpsc::channel(FORWARD_CAPACITY);
        let store = Arc::clone(&self.store);
        let key = self.key.clone();
        let cancel = self.cancel.clone();
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tx.closed() => break,
                    _ = interval.tick() => {}
                }
                let current = match store.get(&key).await {
                    Ok(current) => current,
                    Err(e) => {
                        warn!(%key, error = %e, "relay poll failed");
                        continue;
                    }
                };
                if current == last {
                    continue;
                }
                last = current;
                let Some(raw) = last.as_deref() else {
                    continue;
                };
                match serde_json::from_str::<RelayEnvelope>(raw) {
                    Ok(envelope) => {
                        if tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(%key, error = %e, "unreadable relay envelope"),
                }
            }
            debug!(%key, "storage relay poller stopped");
        });
        Ok(out)
    }
}
