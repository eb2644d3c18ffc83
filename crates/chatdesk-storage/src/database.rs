// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup and WAL mode.
//!
//! All writes go through the single `tokio_rusqlite::Connection` held here.
//! Do NOT open a second connection for writes.

use std::path::Path;

use chatdesk_core::ChatdeskError;
use rusqlite::OptionalExtension;
use tracing::debug;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS snapshots (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
";

/// Convert a tokio-rusqlite error into the crate-wide storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> ChatdeskError {
    ChatdeskError::Storage {
        source: Box::new(e),
    }
}

/// Handle to the snapshot database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and the schema.
    ///
    /// The special path `:memory:` opens a private in-memory database.
    pub async fn open(path: &str) -> Result<Self, ChatdeskError> {
        let conn = if path == ":memory:" {
            tokio_rusqlite::Connection::open_in_memory().await
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| ChatdeskError::Storage {
                    source: Box::new(e),
                })?;
            }
            tokio_rusqlite::Connection::open(path).await
        }
        .map_err(|e| map_tr_err(tokio_rusqlite::Error::Error(e)))?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "snapshot database opened");
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, ChatdeskError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT value FROM snapshots WHERE key = ?1",
                    [&key],
                    |row| row.get::<_, String>(0),
                )
                .optional()
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn put(&self, key: &str, value: String) -> Result<(), ChatdeskError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO snapshots (key, value) VALUES (?1, ?2)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                    rusqlite::params![key, value],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn remove(&self, key: &str) -> Result<(), ChatdeskError> {
        let key = key.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM snapshots WHERE key = ?1", [&key])?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Keys currently stored, sorted.
    pub async fn keys(&self) -> Result<Vec<String>, ChatdeskError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT key FROM snapshots ORDER BY key")?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint(&self) -> Result<(), ChatdeskError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}
