//! Table of contents lifecycle: init, refresh, destroy and active tracking

use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tocnest_core::active::{find_active, highlight};
use tocnest_core::heading::assign_missing_ids;
use tocnest_core::selector::select_first;
use tocnest_core::{
    nest_headings, render, select_headings_excluding, HeadingRecord, NodeId, Options,
};

use crate::event::{Event, EventKind, Subscription};
use crate::page::{Page, WeakPage};
use crate::smooth_scroll::{is_smooth_scroll_link, SmoothScroll, SmoothScrollOptions};
use crate::throttle::Throttle;

/// Lifecycle state of a [`TableOfContents`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Uninitialized,
    Active,
    Destroyed,
}

/// Callbacks run by an active session
#[derive(Clone, Default)]
pub struct Hooks {
    /// The active heading changed
    pub on_activate: Option<Rc<dyn Fn(&HeadingRecord)>>,
    /// A TOC link was clicked
    pub on_click: Option<Rc<dyn Fn(NodeId)>>,
    /// A smooth scroll started from the TOC finished
    pub on_scroll_end: Option<Rc<dyn Fn()>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_activate", &self.on_activate.is_some())
            .field("on_click", &self.on_click.is_some())
            .field("on_scroll_end", &self.on_scroll_end.is_some())
            .finish()
    }
}

/// State shared between the handle and its listeners
struct Session {
    this: Weak<Session>,
    page: WeakPage,
    options: Options,
    hooks: Hooks,
    headings: RefCell<Vec<HeadingRecord>>,
    container: Cell<Option<NodeId>>,
    /// Document generation the node ids above were taken from
    generation: Cell<u64>,
    active: RefCell<Option<HeadingRecord>>,
    highlighting: Cell<bool>,
    scroll_throttle: Throttle,
    click_throttle: Throttle,
}

impl Session {
    /// Select, nest and render the headings into the TOC container
    fn build(&self, page: &Page) {
        let options = &self.options;
        let (headings, container) = page.with_document_mut(|doc| {
            let mut headings = select_headings_excluding(
                doc,
                &options.content_selector,
                &options.heading_selector,
                Some(options.ignore_selector.as_str()),
            );
            if options.generate_missing_ids {
                assign_missing_ids(doc, &mut headings);
            }
            let nested = nest_headings(&headings);
            let container = render(doc, &options.toc_selector, &nested.root, options);
            (headings, container)
        });
        debug!(
            "Rendered {} headings into {:?}",
            headings.len(),
            options.toc_selector
        );
        *self.headings.borrow_mut() = headings;
        *self.active.borrow_mut() = None;
        self.container.set(container);
        self.generation.set(page.document_generation());
    }

    /// False once the page's document was replaced after the last build
    fn is_current(&self, page: &Page) -> bool {
        self.generation.get() == page.document_generation()
    }

    /// One highlight pass for the current scroll position
    fn update(&self) {
        let Some(page) = self.page.upgrade() else {
            return;
        };
        if !self.is_current(&page) {
            debug!("Document replaced, waiting for refresh");
            return;
        }
        let scroll_top = page.scroll_top();
        self.update_fixed_class(&page, scroll_top);

        // Without positions every heading sits at 0 and none is really active
        if !self.highlighting.get() || !page.has_layout() {
            return;
        }
        let Some(container) = self.container.get() else {
            return;
        };

        let heading = {
            let headings = self.headings.borrow();
            let tops: Vec<f64> = headings.iter().map(|h| page.offset_top(h.node)).collect();
            match find_active(&tops, scroll_top, self.options.headings_offset) {
                Some(index) => headings[index].clone(),
                None => return,
            }
        };

        page.with_document_mut(|doc| {
            highlight(doc, container, Some(heading.id.as_str()), &self.options)
        });

        let changed = self
            .active
            .borrow()
            .as_ref()
            .map_or(true, |active| active.node != heading.node);
        if changed {
            debug!("Active heading: {}", heading.id);
            *self.active.borrow_mut() = Some(heading.clone());
            if let Some(hook) = &self.hooks.on_activate {
                hook(&heading);
            }
        }
    }

    fn update_fixed_class(&self, page: &Page, scroll_top: f64) {
        let Some(selector) = self.options.position_fixed_selector.as_deref() else {
            return;
        };
        let threshold = match self.options.fixed_sidebar_offset {
            Some(offset) => offset,
            None => self.container.get().map_or(0.0, |c| page.offset_top(c)),
        };
        let class = &self.options.position_fixed_class;
        page.with_document_mut(|doc| {
            if let Some(element) = select_first(doc, selector) {
                doc.toggle_class(element, class, scroll_top > threshold);
            }
        });
    }

    fn on_scroll(&self) {
        let Some(page) = self.page.upgrade() else {
            return;
        };
        let session = self.this.clone();
        self.scroll_throttle.call(&page, move || {
            let Some(session) = session.upgrade() else {
                return;
            };
            session.update();
            // Reaching the top ends any interrupted smooth scroll
            if session.page.upgrade().is_some_and(|p| p.scroll_top() <= 0.0)
                && !session.highlighting.get()
            {
                session.highlighting.set(true);
                session.update();
            }
        });
    }

    fn on_click(&self, target: NodeId) {
        let Some(page) = self.page.upgrade() else {
            return;
        };
        // Runs unthrottled, ahead of the smooth scroll listener
        if self.options.scroll_smooth
            && self.is_toc_link(target)
            && page.with_document(|doc| is_smooth_scroll_link(doc, target))
        {
            self.highlighting.set(false);
        }
        let session = self.this.clone();
        self.click_throttle.call(&page, move || {
            let Some(session) = session.upgrade() else {
                return;
            };
            let is_toc_link = session.is_toc_link(target);
            session.update();
            if is_toc_link {
                if let Some(hook) = &session.hooks.on_click {
                    hook(target);
                }
            }
        });
    }

    fn on_scroll_end(&self) {
        self.highlighting.set(true);
        self.update();
        if let Some(hook) = &self.hooks.on_scroll_end {
            hook();
        }
    }

    fn is_toc_link(&self, node: NodeId) -> bool {
        let (Some(page), Some(container)) = (self.page.upgrade(), self.container.get()) else {
            return false;
        };
        if !self.is_current(&page) {
            return false;
        }
        page.with_document(|doc| {
            doc.tag_name(node) == Some("a")
                && doc.has_class(node, &self.options.link_class)
                && doc.contains(container, node)
        })
    }

    fn cancel_timers(&self, page: &Page) {
        self.scroll_throttle.cancel(page);
        self.click_throttle.cancel(page);
    }
}

/// A table of contents bound to a page.
///
/// Several handles may share one page; each only touches its own container
/// and listeners.
pub struct TableOfContents {
    page: Page,
    state: State,
    session: Option<Rc<Session>>,
    listeners: Vec<Subscription>,
    smooth_scroll: Option<SmoothScroll>,
}

impl TableOfContents {
    pub fn new(page: &Page) -> Self {
        Self {
            page: page.clone(),
            state: State::Uninitialized,
            session: None,
            listeners: Vec::new(),
            smooth_scroll: None,
        }
    }

    pub fn init(&mut self, options: Options) {
        self.init_with_hooks(options, Hooks::default());
    }

    /// Render the TOC and start tracking the page. An active session is
    /// destroyed first.
    pub fn init_with_hooks(&mut self, options: Options, hooks: Hooks) {
        if self.state == State::Active {
            self.destroy();
        }

        let session = Rc::new_cyclic(|this| Session {
            this: this.clone(),
            page: self.page.downgrade(),
            scroll_throttle: Throttle::new(options.throttle_timeout),
            click_throttle: Throttle::new(options.throttle_timeout),
            options,
            hooks,
            headings: RefCell::new(Vec::new()),
            container: Cell::new(None),
            generation: Cell::new(0),
            active: RefCell::new(None),
            highlighting: Cell::new(true),
        });
        session.build(&self.page);

        let weak = Rc::downgrade(&session);
        let scroll_handler: Rc<dyn Fn(&Event)> = Rc::new(move |_: &Event| {
            if let Some(session) = weak.upgrade() {
                session.on_scroll();
            }
        });
        self.listeners
            .push(self.page.subscribe(EventKind::Scroll, Rc::clone(&scroll_handler)));
        self.listeners
            .push(self.page.subscribe(EventKind::Resize, scroll_handler));

        let weak = Rc::downgrade(&session);
        self.listeners.push(self.page.subscribe(
            EventKind::Click,
            Rc::new(move |event: &Event| {
                if let (Event::Click { target }, Some(session)) = (event, weak.upgrade()) {
                    session.on_click(*target);
                }
            }),
        ));

        if session.options.scroll_smooth {
            let weak = Rc::downgrade(&session);
            self.smooth_scroll = Some(SmoothScroll::attach(
                &self.page,
                SmoothScrollOptions {
                    duration_ms: session.options.scroll_smooth_duration,
                    offset: session.options.scroll_smooth_offset,
                },
                Some(Rc::new(move || {
                    if let Some(session) = weak.upgrade() {
                        session.on_scroll_end();
                    }
                })),
            ));
        }

        session.update();
        info!(
            "Table of contents initialized with {} headings",
            session.headings.borrow().len()
        );
        self.session = Some(session);
        self.state = State::Active;
    }

    /// Rebuild the TOC from the current document, keeping the listeners.
    /// Does nothing unless active.
    pub fn refresh(&mut self) {
        if self.state != State::Active {
            debug!("Refresh ignored in state {:?}", self.state);
            return;
        }
        if let Some(session) = &self.session {
            session.build(&self.page);
            session.update();
        }
    }

    /// Remove the listeners, cancel pending work and empty the container.
    /// Does nothing unless active.
    pub fn destroy(&mut self) {
        if self.state != State::Active {
            return;
        }
        for mut subscription in self.listeners.drain(..) {
            subscription.release();
        }
        if let Some(mut smooth_scroll) = self.smooth_scroll.take() {
            smooth_scroll.release();
        }
        if let Some(session) = self.session.take() {
            session.cancel_timers(&self.page);
            match session.container.get() {
                Some(container) if session.is_current(&self.page) => {
                    self.page.with_document_mut(|doc| doc.remove_children(container));
                }
                Some(_) => debug!("Container belongs to a replaced document, left alone"),
                None => {}
            }
        }
        self.state = State::Destroyed;
        info!("Table of contents destroyed");
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn options(&self) -> Option<&Options> {
        self.session.as_ref().map(|s| &s.options)
    }

    /// Headings of the current session, in document order
    pub fn headings(&self) -> Vec<HeadingRecord> {
        self.session
            .as_ref()
            .map(|s| s.headings.borrow().clone())
            .unwrap_or_default()
    }

    pub fn active_heading(&self) -> Option<HeadingRecord> {
        self.session.as_ref().and_then(|s| s.active.borrow().clone())
    }

    /// The element the TOC was rendered into
    pub fn container(&self) -> Option<NodeId> {
        self.session.as_ref().and_then(|s| s.container.get())
    }

    /// Whether scroll updates currently move the highlight
    pub fn is_highlighting(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.highlighting.get())
    }
}
