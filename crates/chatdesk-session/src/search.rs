// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message search.

use chatdesk_core::{ChatSession, Message};

use crate::SessionStore;

/// One matching message and the session it belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub session: &'a ChatSession,
    pub message: &'a Message,
}

/// Result of [`SessionStore::search_messages`].
///
/// Holds a snapshot of the sessions taken when the search was made. Hits
/// are produced lazily by [`iter`](Self::iter), which can be called any
/// number of times.
#[derive(Debug, Clone)]
pub struct SearchResults {
    needle: String,
    sessions: Vec<ChatSession>,
}

impl SearchResults {
    pub fn iter(&self) -> impl Iterator<Item = SearchHit<'_>> + '_ {
        self.sessions.iter().flat_map(move |session| {
            session
                .messages
                .iter()
                .filter(move |m| m.text.to_lowercase().contains(&self.needle))
                .map(move |message| SearchHit { session, message })
        })
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

impl SessionStore {
    /// Case-insensitive substring search over message text, in one session
    /// or across all of them.
    pub fn search_messages(&self, query: &str, session_id: Option<&str>) -> SearchResults {
        let sessions = self
            .state()
            .sessions
            .iter()
            .filter(|s| session_id.is_none_or(|id| s.id == id))
            .cloned()
            .collect();
        SearchResults {
            needle: query.to_lowercase(),
            sessions,
        }
    }
}
