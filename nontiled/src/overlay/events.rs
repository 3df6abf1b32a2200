//! Overlay events.
//!
//! The overlay holds an [`EventEmitter`] and fires three kinds of events:
//! `loading` when a request is issued, `load` after a swap and `error` when a
//! resource fails and the fallback is substituted.

use std::fmt;

use crate::overlay::SlotId;
use crate::provider::Tag;
use crate::request::RequestKey;

/// Event kinds listeners can register for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Loading,
    Load,
    Error,
}

/// Events fired by an overlay.
#[derive(Debug, Clone)]
pub enum OverlayEvent {
    /// A request was issued.
    Loading { key: RequestKey },

    /// A slot was swapped in.
    Load {
        slot: SlotId,
        key: RequestKey,
        tag: Option<Tag>,
    },

    /// A resource failed to load; `url` is `None` when the provider itself failed.
    Error { slot: SlotId, url: Option<String> },
}

impl OverlayEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            OverlayEvent::Loading { .. } => EventKind::Loading,
            OverlayEvent::Load { .. } => EventKind::Load,
            OverlayEvent::Error { .. } => EventKind::Error,
        }
    }
}

/// Handle returned by [`EventEmitter::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&OverlayEvent)>;

/// Listener registry.
#[derive(Default)]
pub struct EventEmitter {
    listeners: Vec<(ListenerId, EventKind, Listener)>,
    next_id: u64,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for events of `kind`.
    pub fn on(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&OverlayEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Call every listener registered for the event's kind, in registration order.
    pub fn emit(&mut self, event: &OverlayEvent) {
        let kind = event.kind();
        for (_, listener_kind, listener) in self.listeners.iter_mut() {
            if *listener_kind == kind {
                listener(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
