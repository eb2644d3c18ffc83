// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatdesk serve` command implementation.
//!
//! Runs one admin instance: loads persisted sessions, connects the inbound
//! stream, joins the relay and applies events until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use chatdesk_config::ChatdeskConfig;
use chatdesk_core::{ChatTransport, ChatdeskError, EventKind, SessionStatus, TransportEvent};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::compose;
use crate::shutdown::install_signal_handler;

const STATUS_INTERVAL: Duration = Duration::from_secs(60);

/// Runs the `chatdesk serve` command.
pub async fn run_serve(config: ChatdeskConfig) -> Result<(), ChatdeskError> {
    info!(admin = %config.admin.name, "starting chatdesk serve");

    let app = compose(&config, true).await?;

    for session in app.store.sessions() {
        if matches!(session.status, SessionStatus::Active | SessionStatus::Waiting) {
            app.transport.track_session(&session.id);
        }
    }
    log_transport_events(app.transport.as_ref());

    app.store.attach_transport();
    app.store.attach_relay().await;

    // The store works offline; a failed connect is not fatal.
    if let Err(e) = app.transport.connect().await {
        warn!(error = %e, "transport connect failed, continuing offline");
    }
    info!(mode = %app.transport.mode(), "chatdesk serve running");

    let cancel = install_signal_handler();
    status_loop(&app.store, cancel).await;

    app.shutdown().await;
    info!("chatdesk serve shutdown complete");
    Ok(())
}

fn log_transport_events(transport: &dyn ChatTransport) {
    transport.on(
        EventKind::Connected,
        Arc::new(|_: &TransportEvent| info!("inbound stream connected")),
    );
    transport.on(
        EventKind::Disconnected,
        Arc::new(|event: &TransportEvent| {
            if let TransportEvent::Disconnected { reason, terminal } = event {
                if *terminal {
                    warn!(%reason, "inbound stream closed, reconnect with a restart");
                } else {
                    info!(%reason, "inbound stream dropped");
                }
            }
        }),
    );
    transport.on(
        EventKind::Reconnecting,
        Arc::new(|event: &TransportEvent| {
            if let TransportEvent::Reconnecting { attempt, delay_ms } = event {
                info!(attempt, delay_ms, "reconnecting inbound stream");
            }
        }),
    );
}

/// Log a status line every minute until `cancel` fires.
async fn status_loop(store: &chatdesk_session::SessionStore, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(STATUS_INTERVAL);
    interval.tick().await;
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let stats = store.get_session_stats();
                info!(
                    total = stats.total,
                    active = stats.active,
                    waiting = stats.waiting,
                    unread = stats.total_unread,
                    notifications = store.notifications().unread_count(),
                    heap_mb = heap_allocated_mb(),
                    "status"
                );
            }
            _ = cancel.cancelled() => break,
        }
    }
}

#[cfg(not(target_env = "msvc"))]
fn heap_allocated_mb() -> usize {
    // Stats are cached until the epoch advances.
    let _ = tikv_jemalloc_ctl::epoch::advance();
    tikv_jemalloc_ctl::stats::allocated::read().unwrap_or(0) / (1024 * 1024)
}

#[cfg(target_env = "msvc")]
fn heap_allocated_mb() -> usize {
    0
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("chatdesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
