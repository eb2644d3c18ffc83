// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! State sync through a relay process over WebSocket.
//!
//! Envelopes travel as JSON text frames. The relay forwards every frame to
//! every other connected client. Each envelope carries a full snapshot, so
//! a slow subscriber only ever needs the newest one: inbound frames replace
//! each other in a `watch` slot instead of queueing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chatdesk_core::{
    AdapterType, ChatdeskError, HealthStatus, PluginAdapter, RelayEnvelope, StateSync,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const QUEUE_CAPACITY: usize = 64;

pub struct WebSocketSync {
    url: String,
    outbound: mpsc::Sender<String>,
    inbound: Mutex<Option<watch::Receiver<Option<RelayEnvelope>>>>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl WebSocketSync {
    /// Connect to the relay at `url` and start the socket task.
    pub async fn connect(url: &str) -> Result<Self, ChatdeskError> {
        let (socket, _) = connect_async(url).await.map_err(|e| ChatdeskError::Relay {
            message: format!("failed to connect to relay {url}: {e}"),
            source: Some(Box::new(e)),
        })?;
        info!(url, "connected to relay");

        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(QUEUE_CAPACITY);
        let (inbound_tx, inbound) = watch::channel(None);
        let open = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        let task_open = Arc::clone(&open);
        let task_cancel = cancel.clone();
        let task_url = url.to_string();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        let _ = sink.send(WsMessage::Close(None)).await;
                        break;
                    }
                    frame = outbound_rx.recv() => match frame {
                        Some(text) => {
                            if let Err(e) = sink.send(WsMessage::Text(text.into())).await {
                                warn!(url = %task_url, error = %e, "relay send failed");
                                break;
                            }
                        }
                        None => break,
                    },
                    incoming = stream.next() => match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<RelayEnvelope>(text.as_str()) {
                                Ok(envelope) => {
                                    inbound_tx.send_replace(Some(envelope));
                                }
                                Err(e) => debug!(error = %e, "ignoring non-envelope relay frame"),
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(url = %task_url, error = %e, "relay socket error");
                            break;
                        }
                    },
                }
            }
            task_open.store(false, Ordering::SeqCst);
            warn!(url = %task_url, "relay connection closed, continuing without sync");
        });

        Ok(Self {
            url: url.to_string(),
            outbound,
            inbound: Mutex::new(Some(inbound)),
            open,
            cancel,
        })
    }
}

#[async_trait]
impl PluginAdapter for WebSocketSync {
    fn name(&self) -> &str {
        "websocket"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Relay
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        if self.open.load(Ordering::SeqCst) {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(format!("relay {} disconnected", self.url)))
        }
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        self.cancel.cancel();
        Ok(())
    }
}

#[async_trait]
impl StateSync for WebSocketSync {
    async fn publish(&self, envelope: &RelayEnvelope) -> Result<(), ChatdeskError> {
        let text = serde_json::to_string(envelope)?;
        self.outbound
            .send(text)
            .await
            .map_err(|_| ChatdeskError::Relay {
                message: format!("relay {} is closed", self.url),
                source: None,
            })
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<RelayEnvelope>, ChatdeskError> {
        let latest = self
            .inbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| ChatdeskError::Relay {
                message: "relay connection already has a subscriber".into(),
                source: None,
            })?;
        Ok(forward_latest(latest))
    }
}

/// Forward the newest envelope in `latest` whenever it changes. Envelopes
/// replaced before the subscriber caught up are skipped.
fn forward_latest(
    mut latest: watch::Receiver<Option<RelayEnvelope>>,
) -> mpsc::Receiver<RelayEnvelope> {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        while latest.changed().await.is_ok() {
            let next = latest.borrow_and_update().clone();
            if let Some(envelope) = next
                && tx.send(envelope).await.is_err()
            {
                break;
            }
        }
    });
    rx
}
