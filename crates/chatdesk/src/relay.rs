// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `chatdesk relay` command: the cross-instance WebSocket relay.

use chatdesk_config::ChatdeskConfig;
use chatdesk_core::ChatdeskError;
use chatdesk_relay::RelayServer;
use tracing::info;

use crate::shutdown::install_signal_handler;

pub async fn run_relay(config: ChatdeskConfig) -> Result<(), ChatdeskError> {
    let server = RelayServer::bind(&config.relay.listen_host, config.relay.listen_port).await?;
    let addr = server.local_addr()?;
    info!(%addr, "point instances at ws://{addr}/sync with relay.mode = \"websocket\"");

    let cancel = install_signal_handler();
    server.serve(cancel).await?;
    info!("relay shutdown complete");
    Ok(())
}
