//! Event types, listener registry and scoped subscriptions

use std::fmt;
use std::rc::{Rc, Weak};

use tocnest_core::NodeId;

/// Kinds of events a page dispatches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Scroll,
    Resize,
    Click,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Scroll => "scroll",
            EventKind::Resize => "resize",
            EventKind::Click => "click",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page events
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The scroll position changed
    Scroll { top: f64 },
    /// The viewport changed size
    Resize { width: f64, height: f64 },
    /// An element was clicked
    Click { target: NodeId },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Scroll { .. } => EventKind::Scroll,
            Event::Resize { .. } => EventKind::Resize,
            Event::Click { .. } => EventKind::Click,
        }
    }
}

pub type Handler = Rc<dyn Fn(&Event)>;

/// Identifies one registered listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    kind: EventKind,
    handler: Handler,
}

/// Registered listeners in registration order
#[derive(Default)]
pub struct ListenerStore {
    next_id: u64,
    listeners: Vec<Listener>,
}

impl ListenerStore {
    pub fn add(&mut self, kind: EventKind, handler: Handler) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Listener { id, kind, handler });
        id
    }

    /// Remove a listener; false if it was not registered for `kind`
    pub fn remove(&mut self, kind: EventKind, id: ListenerId) -> bool {
        match self
            .listeners
            .iter()
            .position(|l| l.id == id && l.kind == kind)
        {
            Some(pos) => {
                self.listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Handlers for `kind`, cloned so they can run without the store borrowed
    pub fn handlers_for(&self, kind: EventKind) -> Vec<Handler> {
        self.listeners
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| Rc::clone(&l.handler))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn count_for(&self, kind: EventKind) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }

    /// Kinds of all listeners in registration order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.listeners.iter().map(|l| l.kind).collect()
    }
}

/// Something listeners can be attached to
pub trait EventTarget {
    fn add_event_listener(&self, kind: EventKind, handler: Handler) -> ListenerId;
    fn remove_event_listener(&self, kind: EventKind, id: ListenerId) -> bool;
}

/// A listener that stays attached until released or dropped
pub struct Subscription {
    target: Weak<dyn EventTarget>,
    kind: EventKind,
    id: ListenerId,
    active: bool,
}

impl Subscription {
    pub fn attach<T>(target: &Rc<T>, kind: EventKind, handler: Handler) -> Self
    where
        T: EventTarget + 'static,
    {
        let id = target.add_event_listener(kind, handler);
        let target: Rc<dyn EventTarget> = target.clone();
        Self {
            target: Rc::downgrade(&target),
            kind,
            id,
            active: true,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Detach the listener. Returns true only on the call that removed it.
    pub fn release(&mut self) -> bool {
        if !std::mem::take(&mut self.active) {
            return false;
        }
        self.target
            .upgrade()
            .is_some_and(|target| target.remove_event_listener(self.kind, self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
