// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for chatdesk integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockTransport`] - Mock chat backend with event injection and capture
//! - [`MemorySnapshotStore`] - Shared in-memory durable storage
//! - [`RecordingDesktopNotifier`], [`RecordingChime`] - Alert sinks for assertions
//! - [`TestHarness`] - A fully wired store

pub mod alerts;
pub mod harness;
pub mod memory_store;
pub mod mock_transport;

pub use alerts::{RecordingChime, RecordingDesktopNotifier};
pub use harness::{TestHarness, TestHarnessBuilder, eventually};
pub use memory_store::MemorySnapshotStore;
pub use mock_transport::MockTransport;
