// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot commands over the persisted state: `stats`, `export`, `import`.
//!
//! These build the same services as `serve` without alert sinks and
//! without connecting the inbound stream. With a WebSocket relay, an
//! import reaches running instances like any other commit.

use std::path::Path;

use chatdesk_config::ChatdeskConfig;
use chatdesk_core::ChatdeskError;
use serde_json::json;

use crate::app::compose;

pub async fn run_stats(config: ChatdeskConfig) -> Result<(), ChatdeskError> {
    let app = compose(&config, false).await?;
    let stats = app.store.get_session_stats();
    let report = json!({
        "sessions": stats,
        "unreadNotifications": app.store.notifications().unread_count(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    app.shutdown().await;
    Ok(())
}

pub async fn run_export(
    config: ChatdeskConfig,
    session_id: Option<&str>,
    output: Option<&Path>,
) -> Result<(), ChatdeskError> {
    let app = compose(&config, false).await?;
    let exported = match session_id {
        Some(id) => app.store.export_session(id),
        None => app.store.export_sessions(),
    };
    app.shutdown().await;
    let exported = exported?;
    match output {
        Some(path) => tokio::fs::write(path, exported)
            .await
            .map_err(|e| ChatdeskError::Internal(format!("cannot write {}: {e}", path.display())))?,
        None => println!("{exported}"),
    }
    Ok(())
}

pub async fn run_import(config: ChatdeskConfig, input: &Path) -> Result<(), ChatdeskError> {
    let raw = tokio::fs::read_to_string(input)
        .await
        .map_err(|e| ChatdeskError::Internal(format!("cannot read {}: {e}", input.display())))?;
    let app = compose(&config, false).await?;
    let report = app.store.import_sessions_json(&raw).await;
    app.shutdown().await;
    let report = report?;
    println!(
        "imported {} session(s), skipped {} invalid",
        report.imported, report.skipped
    );
    Ok(())
}
