// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SnapshotStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use chatdesk_config::model::StorageConfig;
use chatdesk_core::{AdapterType, ChatdeskError, HealthStatus, PluginAdapter, SnapshotStore};

use crate::database::{Database, map_tr_err};

/// SQLite-backed snapshot store.
///
/// The database is opened lazily by [`SnapshotStore::initialize`].
pub struct SqliteSnapshotStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteSnapshotStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, ChatdeskError> {
        self.db.get().ok_or_else(|| ChatdeskError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteSnapshotStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn initialize(&self) -> Result<(), ChatdeskError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| ChatdeskError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite snapshot store initialized");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError> {
        self.db()?.get(key).await
    }

    async fn put(&self, key: &str, value: String) -> Result<(), ChatdeskError> {
        self.db()?.put(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), ChatdeskError> {
        self.db()?.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn implements_plugin_adapter() {
        let store = SqliteSnapshotStore::new(make_config(":memory:"));
        assert_eq!(store.name(), "sqlite");
        assert_eq!(store.adapter_type(), AdapterType::Storage);
    }

    #[tokio::test]
    async fn calls_before_initialize_fail() {
        let store = SqliteSnapshotStore::new(make_config(":memory:"));
        assert!(store.get("chat_sessions").await.is_err());
        assert!(store.health_check().await.is_err());
        // Nothing to flush yet.
        store.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let store = SqliteSnapshotStore::new(make_config(":memory:"));
        store.initialize().await.unwrap();
        assert!(store.initialize().await.is_err());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let store = SqliteSnapshotStore::new(make_config(path.to_str().unwrap()));
        store.initialize().await.unwrap();
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);

        store.put("chat_sessions", "[1]".into()).await.unwrap();
        store.put("chat_notifications", "[2]".into()).await.unwrap();
        store.remove("chat_sessions").await.unwrap();

        assert_eq!(store.get("chat_sessions").await.unwrap(), None);
        assert_eq!(
            store.get("chat_notifications").await.unwrap().as_deref(),
            Some("[2]")
        );
        store.shutdown().await.unwrap();
    }
}
