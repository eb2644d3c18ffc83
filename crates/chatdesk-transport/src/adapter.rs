// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The transport adapter: one inbound stream plus outbound primitives.
//!
//! The stream runs in its own task and reports through the shared
//! [`EventEmitter`]. A lost stream is retried with exponential backoff
//! (`base * 2^(attempt-1)`) up to the configured attempt count, after which
//! a terminal `disconnected` is emitted and the task exits until the next
//! explicit [`ChatTransport::connect`]. The attempt counter resets only once
//! a reopened stream has delivered an event; a server that accepts and then
//! immediately closes the stream still exhausts the budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chatdesk_config::model::TransportConfig;
use chatdesk_core::types::{
    DeliveryAck, OutboundDelivery, RemoteSession, VisitorInfo, WireEvent,
};
use chatdesk_core::{
    AdapterType, ChatTransport, ChatdeskError, EventEmitter, EventHandler, EventKind,
    HandlerId, HealthStatus, PluginAdapter, TransportEvent,
};
use futures::StreamExt;
use strum::Display;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ChatClient;
use crate::simulated::SimulatedFeed;

/// Which backend the adapter talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransportMode {
    Http,
    Simulated,
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl ReconnectPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_attempts: config.max_reconnect_attempts,
            base_delay: Duration::from_millis(config.reconnect_base_delay_ms),
        }
    }

    /// Delay before `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[derive(Clone)]
enum Backend {
    Http(ChatClient),
    Simulated(Arc<SimulatedFeed>),
}

struct StreamTask {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamTask {
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "event stream task ended abnormally");
        }
    }
}

/// State shared with the stream task.
#[derive(Clone)]
struct StreamContext {
    emitter: Arc<EventEmitter>,
    connected: Arc<AtomicBool>,
    policy: ReconnectPolicy,
    cancel: CancellationToken,
}

impl StreamContext {
    fn opened(&self) {
        self.connected.store(true, Ordering::SeqCst);
        self.emitter.emit(&TransportEvent::Connected);
    }

    fn closed(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Transport adapter over either the HTTP backend or the simulated feed.
pub struct TransportAdapter {
    backend: Backend,
    emitter: Arc<EventEmitter>,
    connected: Arc<AtomicBool>,
    stream: tokio::sync::Mutex<Option<StreamTask>>,
    policy: ReconnectPolicy,
    simulated_interval: Duration,
}

impl TransportAdapter {
    /// Build from configuration. A missing `base_url` selects the simulated
    /// feed.
    pub fn new(config: &TransportConfig) -> Result<Self, ChatdeskError> {
        let backend = match config.base_url.as_deref() {
            Some(base) => Backend::Http(ChatClient::new(base, config)?),
            None => Backend::Simulated(Arc::new(SimulatedFeed::new())),
        };
        Ok(Self {
            backend,
            emitter: Arc::new(EventEmitter::new()),
            connected: Arc::new(AtomicBool::new(false)),
            stream: tokio::sync::Mutex::new(None),
            policy: ReconnectPolicy::from_config(config),
            simulated_interval: Duration::from_secs(config.simulated_interval_secs),
        })
    }

    /// Override the simulated message interval.
    pub fn with_simulated_interval(mut self, interval: Duration) -> Self {
        self.simulated_interval = interval;
        self
    }

    pub fn mode(&self) -> TransportMode {
        match self.backend {
            Backend::Http(_) => TransportMode::Http,
            Backend::Simulated(_) => TransportMode::Simulated,
        }
    }

    async fn stop_stream(&self) -> bool {
        let task = self.stream.lock().await.take();
        match task {
            Some(task) => {
                task.stop().await;
                self.connected.store(false, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PluginAdapter for TransportAdapter {
    fn name(&self) -> &str {
        match self.backend {
            Backend::Http(_) => "http-transport",
            Backend::Simulated(_) => "simulated-transport",
        }
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, ChatdeskError> {
        Ok(match (&self.backend, self.is_connected()) {
            (Backend::Simulated(_), _) | (_, true) => HealthStatus::Healthy,
            (Backend::Http(_), false) => {
                HealthStatus::Degraded("event stream not connected".into())
            }
        })
    }

    async fn shutdown(&self) -> Result<(), ChatdeskError> {
        self.stop_stream().await;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for TransportAdapter {
    async fn connect(&self) -> Result<(), ChatdeskError> {
        let mut slot = self.stream.lock().await;
        if let Some(existing) = slot.take() {
            debug!("tearing down existing event stream before reconnecting");
            existing.stop().await;
            self.connected.store(false, Ordering::SeqCst);
        }

        let cancel = CancellationToken::new();
        let ctx = StreamContext {
            emitter: Arc::clone(&self.emitter),
            connected: Arc::clone(&self.connected),
            policy: self.policy,
            cancel: cancel.clone(),
        };
        let task = match &self.backend {
            Backend::Http(client) => tokio::spawn(run_http_stream(client.clone(), ctx)),
            Backend::Simulated(feed) => tokio::spawn(run_simulated_stream(
                Arc::clone(feed),
                self.simulated_interval,
                ctx,
            )),
        };
        *slot = Some(StreamTask { cancel, task });
        info!(mode = %self.mode(), "transport connecting");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ChatdeskError> {
        if !self.stop_stream().await {
            debug!("disconnect with no open stream");
        }
        self.emitter.emit(&TransportEvent::Disconnected {
            reason: "disconnected by client".into(),
            terminal: true,
        });
        Ok(())
    }

    async fn send_message(
        &self,
        payload: &OutboundDelivery,
    ) -> Result<DeliveryAck, ChatdeskError> {
        match &self.backend {
            Backend::Http(client) => client.send_message(payload).await,
            Backend::Simulated(feed) => Ok(feed.ack(payload)),
        }
    }

    async fn create_session(
        &self,
        visitor: &VisitorInfo,
    ) -> Result<RemoteSession, ChatdeskError> {
        match &self.backend {
            Backend::Http(client) => client.create_session(visitor).await,
            Backend::Simulated(feed) => Ok(feed.allocate(visitor)),
        }
    }

    fn on(&self, kind: EventKind, handler: EventHandler) -> HandlerId {
        self.emitter.on(kind, handler)
    }

    fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        self.emitter.off(kind, id)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn track_session(&self, session_id: &str) {
        if let Backend::Simulated(feed) = &self.backend {
            feed.track(session_id);
        }
    }

    fn release_session(&self, session_id: &str) {
        if let Backend::Simulated(feed) = &self.backend {
            feed.forget(session_id);
            debug!(session_id, "simulated traffic stopped for session");
        }
    }
}

async fn run_http_stream(client: ChatClient, ctx: StreamContext) {
    let mut attempt: u32 = 0;
    loop {
        let opened = tokio::select! {
            _ = ctx.cancel.cancelled() => return,
            opened = client.open_events() => opened,
        };

        let reason = match opened {
            Ok(mut events) => {
                info!(url = client.events_url(), "event stream connected");
                ctx.opened();
                let mut received = false;
                let reason = loop {
                    tokio::select! {
                        _ = ctx.cancel.cancelled() => {
                            ctx.closed();
                            return;
                        }
                        item = events.next() => match item {
                            Some(Ok(WireEvent::NewMessage { session_id, message })) => {
                                received = true;
                                ctx.emitter.emit(&TransportEvent::NewMessage { session_id, message });
                            }
                            Some(Err(e)) => break e.to_string(),
                            None => break "event stream ended".to_string(),
                        }
                    }
                };
                // Only a stream that carried traffic earns a fresh retry budget.
                if received {
                    attempt = 0;
                }
                ctx.closed();
                ctx.emitter.emit(&TransportEvent::Disconnected {
                    reason: reason.clone(),
                    terminal: false,
                });
                reason
            }
            Err(e) => e.to_string(),
        };

        attempt += 1;
        if attempt > ctx.policy.max_attempts {
            warn!(attempts = ctx.policy.max_attempts, %reason, "giving up on event stream");
            ctx.emitter.emit(&TransportEvent::Disconnected {
                reason: format!("reconnect attempts exhausted: {reason}"),
                terminal: true,
            });
            return;
        }

        let delay = ctx.policy.delay(attempt);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        warn!(attempt, delay_ms, %reason, "event stream lost, reconnecting");
        ctx.emitter
            .emit(&TransportEvent::Reconnecting { attempt, delay_ms });
        tokio::select! {
            _ = ctx.cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn run_simulated_stream(feed: Arc<SimulatedFeed>, every: Duration, ctx: StreamContext) {
    ctx.opened();
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                ctx.closed();
                return;
            }
            _ = ticker.tick() => {
                if let Some(event) = feed.next_event() {
                    ctx.emitter.emit(&event);
                }
            }
        }
    }
}
