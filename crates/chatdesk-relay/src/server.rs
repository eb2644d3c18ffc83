// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Relay process for instances that cannot share an in-process channel.
//!
//! Every text frame received from one client is forwarded verbatim to every
//! other connected client. The relay keeps no state beyond the peer table.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
use chatdesk_core::ChatdeskError;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

const PEER_QUEUE: usize = 64;

#[derive(Clone, Default)]
struct RelayState {
    peers: Arc<DashMap<String, mpsc::Sender<String>>>,
}

impl RelayState {
    fn fan_out(&self, from: &str, frame: &str) {
        for peer in self.peers.iter() {
            if peer.key() == from {
                continue;
            }
            if peer.value().try_send(frame.to_string()).is_err() {
                warn!(peer = %peer.key(), "relay peer queue full or closed, frame dropped");
            }
        }
    }
}

/// A bound relay server.
pub struct RelayServer {
    listener: TcpListener,
    state: RelayState,
}

impl RelayServer {
    pub async fn bind(host: &str, port: u16) -> Result<Self, ChatdeskError> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ChatdeskError::Relay {
                message: format!("failed to bind relay to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            listener,
            state: RelayState::default(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ChatdeskError> {
        self.listener.local_addr().map_err(|e| ChatdeskError::Relay {
            message: format!("relay has no local address: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Serve until `cancel` fires.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), ChatdeskError> {
        let app = Router::new()
            .route("/sync", get(ws_handler))
            .route("/health", get(|| async { "ok" }))
            .with_state(self.state)
            .layer(TraceLayer::new_for_http());

        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "relay listening");
        }
        axum::serve(self.listener, app)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
            .map_err(|e| ChatdeskError::Relay {
                message: format!("relay server error: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<RelayState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: RelayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let peer_id = uuid::Uuid::new_v4().to_string();

    let (tx, mut rx) = mpsc::channel::<String>(PEER_QUEUE);
    state.peers.insert(peer_id.clone(), tx);
    debug!(peer = %peer_id, peers = state.peers.len(), "relay peer joined");

    let sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Text(text) => state.fan_out(&peer_id, text.as_str()),
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.peers.remove(&peer_id);
    sender_task.abort();
    debug!(peer = %peer_id, "relay peer left");
}
