// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-instance state relay for chatdesk.
//!
//! Keeps several running instances consistent by broadcasting full state
//! snapshots. Four interchangeable [`StateSync`](chatdesk_core::StateSync)
//! implementations are provided: the shared snapshot database, an
//! in-process named channel, a WebSocket client for a relay process, and a
//! no-op. [`SyncRelay`] adds the tab id,
//! the echo guard and the suppression flag on top of whichever is in use.

pub mod broadcast;
pub mod build;
pub mod hub;
pub mod none;
pub mod relay;
pub mod server;
pub mod storage;
pub mod websocket;

pub use broadcast::BroadcastSync;
pub use build::build_sync;
pub use hub::BroadcastHub;
pub use none::NoSync;
pub use relay::{RelayInbox, SESSIONS_UPDATED, SuppressGuard, SyncRelay};
pub use server::RelayServer;
pub use storage::StorageSync;
pub use websocket::WebSocketSync;
