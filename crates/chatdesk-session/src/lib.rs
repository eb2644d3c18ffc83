// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store for chatdesk.
//!
//! [`SessionStore`] owns the canonical copy of every chat session and its
//! messages. Commands are typed methods, each one atomic transition that is
//! then persisted and broadcast to the other instances. Network failures
//! degrade to local-only state; integrity failures surface as
//! [`ChatdeskError::NotFound`](chatdesk_core::ChatdeskError::NotFound).

pub mod filter;
pub mod search;
pub mod store;
pub mod sync;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

pub use filter::{AssigneeFilter, SessionFilter};
pub use search::{SearchHit, SearchResults};
pub use store::{SessionStore, SessionStoreBuilder};
pub use transfer::{ImportReport, validate_candidate};
