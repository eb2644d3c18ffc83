// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter for the chatdesk coordinator.
//!
//! Maintains exactly one inbound event stream from the chat backend and
//! provides outbound delivery and session allocation. Without a configured
//! backend URL the adapter runs a simulated feed with identical events.

pub mod adapter;
pub mod client;
pub mod simulated;
pub mod sse;

pub use adapter::{ReconnectPolicy, TransportAdapter, TransportMode};
pub use client::ChatClient;
pub use simulated::SimulatedFeed;
