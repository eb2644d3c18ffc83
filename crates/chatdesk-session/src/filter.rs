// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The admin's session list filter.

use chatdesk_core::{ChatSession, Priority, SessionStatus};
use serde::{Deserialize, Serialize};

use crate::SessionStore;

/// Who a session must be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "adminId")]
pub enum AssigneeFilter {
    Unassigned,
    Admin(String),
}

/// Every set field must match. The default filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFilter {
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<AssigneeFilter>,
    #[serde(default)]
    pub tag: Option<String>,
    /// Case-insensitive match on visitor name, email, phone or last message.
    #[serde(default)]
    pub query: Option<String>,
}

impl SessionFilter {
    pub fn matches(&self, session: &ChatSession) -> bool {
        if self.status.is_some_and(|s| s != session.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != session.priority) {
            return false;
        }
        match &self.assignee {
            Some(AssigneeFilter::Unassigned) if session.assigned_admin.is_some() => return false,
            Some(AssigneeFilter::Admin(id))
                if session.assigned_admin.as_ref().is_none_or(|a| &a.id != id) =>
            {
                return false;
            }
            _ => {}
        }
        if let Some(tag) = &self.tag
            && !session.has_tag(tag)
        {
            return false;
        }
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => {
                let q = q.to_lowercase();
                [
                    Some(session.visitor_name.as_str()),
                    session.visitor_email.as_deref(),
                    session.visitor_phone.as_deref(),
                    session.last_message.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&q))
            }
            _ => true,
        }
    }
}

impl SessionStore {
    pub fn set_filter(&self, filter: SessionFilter) {
        self.state().filter = filter;
    }

    pub fn filter(&self) -> SessionFilter {
        self.state().filter.clone()
    }

    /// Sessions passing the current filter, most recent activity first.
    pub fn filtered_sessions(&self) -> Vec<ChatSession> {
        let state = self.state();
        let mut out: Vec<ChatSession> = state
            .sessions
            .iter()
            .filter(|s| state.filter.matches(s))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdesk_core::{AssignedAdmin, VisitorInfo};

    fn session(name: &str) -> ChatSession {
        ChatSession::new(name, &VisitorInfo::named(name), chrono::Utc::now())
    }

    #[test]
    fn default_matches_everything() {
        assert!(SessionFilter::default().matches(&session("Ahmad")));
    }

    #[test]
    fn fields_combine() {
        let mut s = session("Ahmad");
        s.priority = Priority::High;
        s.tags.push("diesel".into());
        s.assigned_admin = Some(AssignedAdmin {
            id: "a1".into(),
            name: "Mona".into(),
        });

        let filter = SessionFilter {
            priority: Some(Priority::High),
            tag: Some("diesel".into()),
            assignee: Some(AssigneeFilter::Admin("a1".into())),
            ..Default::default()
        };
        assert!(filter.matches(&s));

        let other_admin = SessionFilter {
            assignee: Some(AssigneeFilter::Admin("a2".into())),
            ..Default::default()
        };
        assert!(!other_admin.matches(&s));

        let unassigned = SessionFilter {
            assignee: Some(AssigneeFilter::Unassigned),
            ..Default::default()
        };
        assert!(!unassigned.matches(&s));
        assert!(unassigned.matches(&session("Sara")));

        let closed = SessionFilter {
            status: Some(SessionStatus::Closed),
            ..Default::default()
        };
        assert!(!closed.matches(&s));
    }

    #[test]
    fn query_is_case_insensitive_across_fields() {
        let mut s = session("Ahmad");
        s.visitor_email = Some("ahmad@example.com".into());
        s.last_message = Some("Need a 500 KVA generator".into());

        let q = |text: &str| SessionFilter {
            query: Some(text.into()),
            ..Default::default()
        };
        assert!(q("AHMAD").matches(&s));
        assert!(q("example.com").matches(&s));
        assert!(q("kva").matches(&s));
        assert!(q("   ").matches(&s));
        assert!(!q("solar").matches(&s));
    }
}
