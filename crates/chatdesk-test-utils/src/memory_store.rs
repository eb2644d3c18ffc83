// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory snapshot store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chatdesk_core::{AdapterType, ChatdeskError, HealthStatus, PluginAdapter, SnapshotStore};

/// A `SnapshotStore` over a `HashMap`, shareable between store instances
/// to stand in for durable storage common to several tabs.
#[derive(Default)]
pub struct MemorySnapshotStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record under `key`, for assertions.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl PluginAdapter for MemorySnapshotStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn initialize(&self) -> Result<(), ChatdeskError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError> {
        Ok(self.raw(key))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), ChatdeskError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), ChatdeskError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
