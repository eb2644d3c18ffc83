// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Composition root shared by the commands.

use std::sync::Arc;

use chatdesk_config::ChatdeskConfig;
use chatdesk_core::{ChatTransport, ChatdeskError, PluginAdapter, SnapshotStore};
use chatdesk_notify::NotificationEngine;
use chatdesk_relay::{BroadcastHub, SyncRelay, build_sync};
use chatdesk_session::SessionStore;
use chatdesk_storage::SqliteSnapshotStore;
use chatdesk_transport::TransportAdapter;
use tracing::{debug, info, warn};

/// Every long-lived service of one instance.
pub struct App {
    pub store: SessionStore,
    pub transport: Arc<TransportAdapter>,
    pub snapshots: Arc<SqliteSnapshotStore>,
}

/// Build the services from configuration and load persisted state.
///
/// `alerts` wires the desktop and chime sinks the config enables; one-shot
/// commands leave them out.
pub async fn compose(config: &ChatdeskConfig, alerts: bool) -> Result<App, ChatdeskError> {
    let snapshots = Arc::new(SqliteSnapshotStore::new(config.storage.clone()));
    snapshots.initialize().await?;

    let transport = Arc::new(TransportAdapter::new(&config.transport)?);

    let engine = if alerts {
        NotificationEngine::from_config(&config.notifications)
    } else {
        NotificationEngine::new()
    };
    let shared: Arc<dyn SnapshotStore> = snapshots.clone();
    let notifications = Arc::new(
        engine.with_persistence(shared.clone(), config.storage.notifications_key.clone()),
    );
    notifications.load().await?;

    let hub = Arc::new(BroadcastHub::new());
    let relay = SyncRelay::new(build_sync(&config.relay, &hub, &shared).await);
    debug!(tab_id = relay.tab_id(), backend = relay.backend(), "relay ready");

    let store = SessionStore::builder(transport.clone())
        .notifications(notifications)
        .relay(Arc::new(relay))
        .persistence(shared, config.storage.sessions_key.clone())
        .build();
    let loaded = store.load().await?;
    info!(sessions = loaded, transport = transport.name(), "chatdesk services ready");

    Ok(App {
        store,
        transport,
        snapshots,
    })
}

impl App {
    /// Tear everything down. Failures are logged.
    pub async fn shutdown(&self) {
        if self.transport.is_connected()
            && let Err(e) = self.transport.disconnect().await
        {
            warn!(error = %e, "transport disconnect failed");
        }
        self.store.shutdown().await;
        if let Err(e) = self.snapshots.shutdown().await {
            warn!(error = %e, "storage shutdown failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_core::VisitorInfo;
    use chatdesk_test_utils::eventually;

    fn shared_config(dir: &tempfile::TempDir) -> ChatdeskConfig {
        let mut config = ChatdeskConfig::default();
        config.storage.database_path = dir.path().join("chatdesk.db").to_string_lossy().to_string();
        config.relay.poll_interval_ms = 10;
        config
    }

    #[tokio::test]
    async fn instances_on_one_database_stay_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let config = shared_config(&dir);
        let first = compose(&config, false).await.unwrap();
        let second = compose(&config, false).await.unwrap();
        first.store.attach_relay().await;
        second.store.attach_relay().await;

        let id = first
            .store
            .create_session(VisitorInfo::named("Ahmad"))
            .await;
        eventually(|| second.store.session(&id).is_some()).await;

        second.store.close_session(&id).await.unwrap();
        eventually(|| {
            first
                .store
                .session(&id)
                .is_some_and(|s| s.status == chatdesk_core::SessionStatus::Closed)
        })
        .await;

        first.shutdown().await;
        second.shutdown().await;
    }

    #[tokio::test]
    async fn default_relay_is_the_shared_database() {
        let dir = tempfile::tempdir().unwrap();
        let app = compose(&shared_config(&dir), false).await.unwrap();
        assert_eq!(app.store.relay().unwrap().backend(), "storage");
        app.shutdown().await;
    }
}
