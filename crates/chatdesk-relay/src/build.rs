// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Select the sync implementation from configuration.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::model::{RelayConfig, RelayMode};
use chatdesk_core::{SnapshotStore, StateSync};
use tracing::{info, warn};

use crate::{BroadcastHub, BroadcastSync, NoSync, StorageSync, WebSocketSync};

/// Build the configured sync implementation.
///
/// `snapshots` is the initialized store storage mode exchanges envelopes
/// through. Never fails: a missing relay URL or an unreachable relay
/// degrades to [`NoSync`] with a warning.
pub async fn build_sync(
    config: &RelayConfig,
    hub: &Arc<BroadcastHub>,
    snapshots: &Arc<dyn SnapshotStore>,
) -> Arc<dyn StateSync> {
    match config.mode {
        RelayMode::Storage => {
            info!(channel = %config.channel_name, "relay: shared snapshot database");
            Arc::new(StorageSync::new(
                Arc::clone(snapshots),
                &config.channel_name,
                Duration::from_millis(config.poll_interval_ms),
            ))
        }
        RelayMode::Broadcast => {
            warn!(
                channel = %config.channel_name,
                "relay: in-process broadcast only links stores inside this process"
            );
            Arc::new(BroadcastSync::new(hub, &config.channel_name))
        }
        RelayMode::Websocket => match config.relay_url.as_deref() {
            Some(url) => match WebSocketSync::connect(url).await {
                Ok(sync) => Arc::new(sync),
                Err(e) => {
                    warn!(error = %e, "relay unavailable, running single-instance");
                    Arc::new(NoSync)
                }
            },
            None => {
                warn!("relay.mode is websocket but no relay_url is set, running single-instance");
                Arc::new(NoSync)
            }
        },
        RelayMode::None => Arc::new(NoSync),
    }
}
