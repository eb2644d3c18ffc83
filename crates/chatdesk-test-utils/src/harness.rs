// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete store with a mock transport,
//! recording alert sinks, a snapshot store and optionally a relay on a
//! shared in-process hub, so several harnesses can act as separate tabs.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::StorageConfig;
use chatdesk_core::{ChatdeskError, NotificationPermission, SnapshotStore};
use chatdesk_notify::NotificationEngine;
use chatdesk_relay::{BroadcastHub, BroadcastSync, SyncRelay};
use chatdesk_session::SessionStore;
use chatdesk_storage::SqliteSnapshotStore;

use crate::alerts::{RecordingChime, RecordingDesktopNotifier};
use crate::memory_store::MemorySnapshotStore;
use crate::mock_transport::MockTransport;

pub const SESSIONS_KEY: &str = "chat_sessions";
pub const NOTIFICATIONS_KEY: &str = "chat_notifications";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    failing: bool,
    relay: Option<(Arc<BroadcastHub>, String)>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    sqlite: bool,
    permission: (NotificationPermission, NotificationPermission),
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            failing: false,
            relay: None,
            snapshots: None,
            sqlite: false,
            permission: (
                NotificationPermission::Default,
                NotificationPermission::Granted,
            ),
        }
    }

    /// Make every remote call of the mock transport fail.
    pub fn with_failing_transport(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Join the broadcast channel on `hub` as `tab_id`.
    pub fn with_relay(mut self, hub: &Arc<BroadcastHub>, tab_id: &str) -> Self {
        self.relay = Some((Arc::clone(hub), tab_id.to_string()));
        self
    }

    /// Share an initialized snapshot store with other harnesses.
    pub fn with_snapshots(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    /// Use a SQLite database in a temp directory instead of memory.
    pub fn with_sqlite(mut self) -> Self {
        self.sqlite = true;
        self
    }

    /// Initial desktop permission and the answer to a permission request.
    pub fn with_permission(
        mut self,
        initial: NotificationPermission,
        answer: NotificationPermission,
    ) -> Self {
        self.permission = (initial, answer);
        self
    }

    /// Build the harness, load persisted state and start the drivers.
    pub async fn build(self) -> Result<TestHarness, ChatdeskError> {
        let mut temp_dir = None;
        let snapshots: Arc<dyn SnapshotStore> = match (self.snapshots, self.sqlite) {
            (Some(shared), _) => shared,
            (None, true) => {
                let dir = tempfile::TempDir::new()
                    .map_err(|e| ChatdeskError::Storage { source: e.into() })?;
                let config = StorageConfig {
                    database_path: dir.path().join("test.db").to_string_lossy().to_string(),
                    ..StorageConfig::default()
                };
                temp_dir = Some(dir);
                let sqlite = SqliteSnapshotStore::new(config);
                sqlite.initialize().await?;
                Arc::new(sqlite)
            }
            (None, false) => Arc::new(MemorySnapshotStore::new()),
        };

        let transport = Arc::new(MockTransport::new());
        transport.set_fail_all(self.failing);
        let desktop = Arc::new(RecordingDesktopNotifier::new(
            self.permission.0,
            self.permission.1,
        ));
        let chime = Arc::new(RecordingChime::new());

        let notifications = Arc::new(
            NotificationEngine::new()
                .with_desktop(desktop.clone())
                .with_chime(chime.clone())
                .with_persistence(Arc::clone(&snapshots), NOTIFICATIONS_KEY),
        );
        notifications.load().await?;

        let mut builder = SessionStore::builder(transport.clone())
            .notifications(notifications)
            .persistence(Arc::clone(&snapshots), SESSIONS_KEY);
        if let Some((hub, tab_id)) = &self.relay {
            let sync = Arc::new(BroadcastSync::new(hub, "chatdesk-sync"));
            builder = builder.relay(Arc::new(SyncRelay::with_tab_id(sync, tab_id.clone())));
        }
        let store = builder.build();
        store.load().await?;
        store.attach_transport();
        store.attach_relay().await;

        Ok(TestHarness {
            store,
            transport,
            snapshots,
            desktop,
            chime,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete store wired to mocks.
pub struct TestHarness {
    pub store: SessionStore,
    pub transport: Arc<MockTransport>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub desktop: Arc<RecordingDesktopNotifier>,
    pub chime: Arc<RecordingChime>,
    _temp_dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default options.
    pub async fn new() -> Result<Self, ChatdeskError> {
        Self::builder().build().await
    }

    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}

/// Poll `check` until it holds, failing after about two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within the deadline");
}
