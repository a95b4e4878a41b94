//! Page host: document, scroll position, layout offsets, timers and listeners

use anyhow::{bail, Result};
use log::debug;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tocnest_core::heading::heading_level;
use tocnest_core::{Document, NodeId};

use crate::event::{Event, EventKind, EventTarget, Handler, ListenerId, ListenerStore, Subscription};

/// Upper bound on timers run by one [`Page::flush_timers`] call
pub const TIMER_STEP_LIMIT: usize = 10_000;

/// Elements that take up a block of vertical space in [`Page::layout_flow`]
const FLOW_BLOCKS: [&str; 14] = [
    "p", "li", "pre", "blockquote", "img", "hr", "table", "tr", "dt", "dd", "figure", "section",
    "article", "nav",
];

/// Identifies a scheduled timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct Timer {
    id: TimerId,
    due: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct TimerQueue {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    /// Remove and return the earliest timer due at or before `until`.
    /// Ties run in scheduling order.
    fn pop_due(&mut self, until: u64) -> Option<Timer> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(_, t)| (t.due, t.id.0))
            .map(|(i, _)| i)?;
        Some(self.timers.remove(index))
    }

    fn next_due(&self) -> Option<u64> {
        self.timers.iter().map(|t| t.due).min()
    }
}

struct PageInner {
    document: RefCell<Document>,
    generation: Cell<u64>,
    listeners: RefCell<ListenerStore>,
    scroll_top: Cell<f64>,
    viewport: Cell<(f64, f64)>,
    offsets: RefCell<HashMap<NodeId, f64>>,
    location_hash: RefCell<String>,
    now_ms: Cell<u64>,
    timers: RefCell<TimerQueue>,
}

impl EventTarget for PageInner {
    fn add_event_listener(&self, kind: EventKind, handler: Handler) -> ListenerId {
        let id = self.listeners.borrow_mut().add(kind, handler);
        debug!("Added {kind} listener {id:?}");
        id
    }

    fn remove_event_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        let removed = self.listeners.borrow_mut().remove(kind, id);
        if removed {
            debug!("Removed {kind} listener {id:?}");
        }
        removed
    }
}

/// The host a table of contents lives in.
///
/// Cloning yields another handle to the same page.
#[derive(Clone)]
pub struct Page {
    inner: Rc<PageInner>,
}

/// Non-owning page handle held by listeners and timers
#[derive(Clone)]
pub struct WeakPage(Weak<PageInner>);

impl WeakPage {
    pub fn upgrade(&self) -> Option<Page> {
        self.0.upgrade().map(|inner| Page { inner })
    }
}

impl Page {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Rc::new(PageInner {
                document: RefCell::new(document),
                generation: Cell::new(0),
                listeners: RefCell::new(ListenerStore::default()),
                scroll_top: Cell::new(0.0),
                viewport: Cell::new((1024.0, 768.0)),
                offsets: RefCell::new(HashMap::new()),
                location_hash: RefCell::new(String::new()),
                now_ms: Cell::new(0),
                timers: RefCell::new(TimerQueue::default()),
            }),
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(Document::parse(html))
    }

    pub fn downgrade(&self) -> WeakPage {
        WeakPage(Rc::downgrade(&self.inner))
    }

    /// Run `f` with the document borrowed
    pub fn with_document<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.document.borrow())
    }

    /// Run `f` with the document borrowed mutably
    pub fn with_document_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.inner.document.borrow_mut())
    }

    /// Swap in a new document. Layout offsets belong to the old tree and are
    /// dropped; node ids handed out before this call no longer apply.
    pub fn replace_document(&self, document: Document) {
        *self.inner.document.borrow_mut() = document;
        self.inner.offsets.borrow_mut().clear();
        self.inner.generation.set(self.inner.generation.get() + 1);
        debug!("Document replaced, generation {}", self.inner.generation.get());
    }

    /// Bumped by every [`Page::replace_document`]
    pub fn document_generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn to_html(&self) -> String {
        self.with_document(Document::to_html)
    }

    // Events

    pub fn add_event_listener(&self, kind: EventKind, handler: Handler) -> ListenerId {
        self.inner.add_event_listener(kind, handler)
    }

    pub fn remove_event_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.remove_event_listener(kind, id)
    }

    /// Attach a listener that is removed when the subscription goes away
    pub fn subscribe(&self, kind: EventKind, handler: Handler) -> Subscription {
        Subscription::attach(&self.inner, kind, handler)
    }

    /// Run every listener for the event's kind, in registration order
    pub fn dispatch(&self, event: &Event) {
        let handlers = self.inner.listeners.borrow().handlers_for(event.kind());
        for handler in handlers {
            handler(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn listener_count_for(&self, kind: EventKind) -> usize {
        self.inner.listeners.borrow().count_for(kind)
    }

    pub fn listener_kinds(&self) -> Vec<EventKind> {
        self.inner.listeners.borrow().kinds()
    }

    // Scrolling and layout

    pub fn scroll_top(&self) -> f64 {
        self.inner.scroll_top.get()
    }

    /// Move the scroll position (clamped at 0) and dispatch a scroll event
    pub fn scroll_to(&self, top: f64) {
        let top = top.max(0.0);
        self.inner.scroll_top.set(top);
        self.dispatch(&Event::Scroll { top });
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.inner.viewport.get()
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.inner.viewport.set((width, height));
        self.dispatch(&Event::Resize { width, height });
    }

    pub fn click(&self, target: NodeId) {
        self.dispatch(&Event::Click { target });
    }

    pub fn location_hash(&self) -> String {
        self.inner.location_hash.borrow().clone()
    }

    pub fn set_location_hash(&self, hash: &str) {
        *self.inner.location_hash.borrow_mut() = hash.to_string();
    }

    /// Distance from the top of the page; elements without a layout sit at 0
    pub fn offset_top(&self, node: NodeId) -> f64 {
        self.inner.offsets.borrow().get(&node).copied().unwrap_or(0.0)
    }

    /// True once any element has been given a position
    pub fn has_layout(&self) -> bool {
        !self.inner.offsets.borrow().is_empty()
    }

    pub fn set_offset_top(&self, node: NodeId, top: f64) {
        self.inner.offsets.borrow_mut().insert(node, top);
    }

    /// Estimate offsets by stacking blocks of `block_height` in document order.
    ///
    /// Headings and block elements each advance the flow; other elements take
    /// the position of whatever comes next. Returns the total height.
    pub fn layout_flow(&self, block_height: f64) -> f64 {
        let document = self.inner.document.borrow();
        let mut offsets = self.inner.offsets.borrow_mut();
        let mut y = 0.0;
        for node in document.descendant_elements(document.root()) {
            offsets.insert(node, y);
            let advances = document
                .tag_name(node)
                .is_some_and(|tag| heading_level(tag).is_some() || FLOW_BLOCKS.contains(&tag));
            if advances {
                y += block_height;
            }
        }
        y
    }

    // Timers

    /// Milliseconds since the page was created
    pub fn now(&self) -> u64 {
        self.inner.now_ms.get()
    }

    /// Schedule `callback` to run `delay_ms` from now
    pub fn set_timeout(&self, delay_ms: u64, callback: impl FnOnce() + 'static) -> TimerId {
        let mut timers = self.inner.timers.borrow_mut();
        timers.next_id += 1;
        let id = TimerId(timers.next_id);
        timers.timers.push(Timer {
            id,
            due: self.now().saturating_add(delay_ms),
            callback: Box::new(callback),
        });
        id
    }

    /// Cancel a pending timer; false if it already ran or was cancelled
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut timers = self.inner.timers.borrow_mut();
        let before = timers.timers.len();
        timers.timers.retain(|t| t.id != id);
        timers.timers.len() != before
    }

    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().timers.len()
    }

    /// Move the clock forward, running every timer that falls due on the way.
    /// Returns the number of timers run.
    pub fn advance_time(&self, delta_ms: u64) -> usize {
        let target = self.now().saturating_add(delta_ms);
        let mut ran = 0;
        loop {
            let next = self.inner.timers.borrow_mut().pop_due(target);
            let Some(timer) = next else {
                break;
            };
            self.inner.now_ms.set(self.now().max(timer.due));
            (timer.callback)();
            ran += 1;
        }
        self.inner.now_ms.set(target);
        ran
    }

    /// Run timers until none are left, advancing the clock as needed
    pub fn flush_timers(&self) -> Result<usize> {
        let mut ran = 0;
        loop {
            let next_due = self.inner.timers.borrow().next_due();
            let Some(due) = next_due else {
                return Ok(ran);
            };
            if ran >= TIMER_STEP_LIMIT {
                bail!("Timer queue did not settle after {TIMER_STEP_LIMIT} timers");
            }
            ran += self.advance_time(due.saturating_sub(self.now()));
        }
    }
}
