// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for every seam of the coordinator.
//!
//! Transport, relay and storage adapters extend the [`PluginAdapter`] base
//! trait and use `#[async_trait]` for dynamic dispatch compatibility.
//! Alert sinks are plain traits.

pub mod adapter;
pub mod alert;
pub mod storage;
pub mod sync;
pub mod transport;

pub use adapter::PluginAdapter;
pub use alert::{ChimePlayer, DesktopNotifier};
pub use storage::SnapshotStore;
pub use sync::StateSync;
pub use transport::ChatTransport;
