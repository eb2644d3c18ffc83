// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for chatdesk snapshots.
//!
//! Each snapshot (the session list, the notification list) is a single JSON
//! document stored under its own key. Writes are serialized through
//! `tokio-rusqlite`'s background thread.

pub mod adapter;
pub mod database;
pub mod snapshot;

pub use adapter::SqliteSnapshotStore;
pub use database::Database;
pub use snapshot::{SCHEMA_VERSION, decode_snapshot, decode_snapshot_strict, encode_snapshot};
