// SPDX-FileCopyrightText: 2026 Chatdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named-event publish/subscribe used by transports.
//!
//! Handlers run synchronously, in registration order, on whichever task
//! emits the event. There is no ordering guarantee across kinds.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::{EventKind, TransportEvent};

/// Callback invoked for each emitted event of a subscribed kind.
pub type EventHandler = Arc<dyn Fn(&TransportEvent) + Send + Sync>;

/// Token returned by [`EventEmitter::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type HandlerTable = HashMap<EventKind, Vec<(HandlerId, EventHandler)>>;

/// Registry of event handlers keyed by [`EventKind`].
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    handlers: Mutex<HandlerTable>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HandlerTable> {
        // A panicking handler never runs under this lock, so the table is
        // still consistent if poisoned.
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `handler` for `kind`. Several handlers per kind are allowed.
    pub fn on(&self, kind: EventKind, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.table().entry(kind).or_default().push((id, handler));
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn off(&self, kind: EventKind, id: HandlerId) -> bool {
        let mut table = self.table();
        let Some(list) = table.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        before != list.len()
    }

    /// Dispatch `event` to every handler registered for its kind.
    pub fn emit(&self, event: &TransportEvent) {
        // Snapshot the list so handlers may call on()/off() re-entrantly.
        let handlers: Vec<EventHandler> = self
            .table()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(event);
        }
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.table().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .table()
            .iter()
            .map(|(k, v)| (*k, v.len()))
            .collect();
        f.debug_struct("EventEmitter")
            .field("handlers", &counts)
            .finish()
    }
}
