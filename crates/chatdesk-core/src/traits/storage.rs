// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable key/value storage for serialized state snapshots.

use async_trait::async_trait;

use crate::error::ChatdeskError;
use crate::traits::adapter::PluginAdapter;

/// Durable storage shared by every instance on the machine.
///
/// Each key holds one serialized record. There is no locking across
/// instances; the last `put` wins.
#[async_trait]
pub trait SnapshotStore: PluginAdapter {
    /// Prepares the backend (open files, create tables).
    async fn initialize(&self) -> Result<(), ChatdeskError>;

    /// Reads the record stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError>;

    /// Replaces the record stored under `key`.
    async fn put(&self, key: &str, value: String) -> Result<(), ChatdeskError>;

    /// Deletes the record stored under `key`, if any.
    async fn remove(&self, key: &str) -> Result<(), ChatdeskError>;
}
