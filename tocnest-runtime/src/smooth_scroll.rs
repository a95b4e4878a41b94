//! Animated scrolling to in-page anchors

use log::debug;
use std::cell::RefCell;
use std::rc::Rc;

use tocnest_core::{Document, NodeId};

use crate::event::{Event, EventKind, Subscription};
use crate::page::{Page, TimerId, WeakPage};

/// Milliseconds between animation frames
pub const FRAME_MS: u64 = 16;

/// Links carrying this class jump without animation
pub const NO_SMOOTH_SCROLL_CLASS: &str = "no-smooth-scroll";

/// Cubic ease-in-out from `start` over `change`, at `elapsed` of `duration`
pub fn ease_in_out_cubic(elapsed: f64, start: f64, change: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return start + change;
    }
    let mut t = elapsed / (duration / 2.0);
    if t < 1.0 {
        return change / 2.0 * t * t * t + start;
    }
    t -= 2.0;
    change / 2.0 * (t * t * t + 2.0) + start
}

/// Settings for [`SmoothScroll::attach`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothScrollOptions {
    pub duration_ms: u64,
    /// Pixels kept free above the destination
    pub offset: f64,
}

type Callback = Rc<dyn Fn()>;

/// Click listener that animates the page to the target of `#id` links.
///
/// Dropping it removes the listener and cancels frames still pending.
pub struct SmoothScroll {
    page: WeakPage,
    frames: Rc<RefCell<Vec<TimerId>>>,
    subscription: Subscription,
}

impl SmoothScroll {
    /// Listen for clicks on `page`. `on_complete` runs once the animation for
    /// a click has finished, or right away when the link's target is missing.
    pub fn attach(page: &Page, options: SmoothScrollOptions, on_complete: Option<Callback>) -> Self {
        let frames: Rc<RefCell<Vec<TimerId>>> = Rc::default();
        let weak = page.downgrade();
        let pending = Rc::clone(&frames);

        let subscription = page.subscribe(
            EventKind::Click,
            Rc::new(move |event: &Event| {
                let Event::Click { target } = *event else {
                    return;
                };
                let Some(page) = weak.upgrade() else {
                    return;
                };
                let Some(hash) = page.with_document(|doc| in_page_hash(doc, target)) else {
                    return;
                };
                cancel_frames(&page, &pending);
                jump(&page, &hash, options, &pending, on_complete.clone());
            }),
        );

        Self {
            page: page.downgrade(),
            frames,
            subscription,
        }
    }

    /// True while an animation has frames left to run
    pub fn is_animating(&self) -> bool {
        !self.frames.borrow().is_empty()
    }

    /// Remove the listener and cancel pending frames
    pub fn release(&mut self) {
        self.subscription.release();
        if let Some(page) = self.page.upgrade() {
            cancel_frames(&page, &self.frames);
        }
    }
}

impl Drop for SmoothScroll {
    fn drop(&mut self) {
        self.release();
    }
}

/// True if a click on `target` starts an animation rather than a plain jump
pub fn is_smooth_scroll_link(doc: &Document, target: NodeId) -> bool {
    in_page_hash(doc, target).is_some()
}

/// The `#id` a click on `target` should scroll to, if any
fn in_page_hash(doc: &Document, target: NodeId) -> Option<String> {
    if doc.tag_name(target) != Some("a") || doc.has_class(target, NO_SMOOTH_SCROLL_CLASS) {
        return None;
    }
    let href = doc.attr(target, "href")?;
    let id = href.strip_prefix('#')?;
    // `#!` routes are not anchors
    if id.is_empty() || id.starts_with('!') {
        return None;
    }
    Some(href.to_string())
}

fn cancel_frames(page: &Page, frames: &RefCell<Vec<TimerId>>) {
    for timer in frames.borrow_mut().drain(..) {
        page.clear_timeout(timer);
    }
}

fn jump(
    page: &Page,
    hash: &str,
    options: SmoothScrollOptions,
    frames: &Rc<RefCell<Vec<TimerId>>>,
    on_complete: Option<Callback>,
) {
    let id = &hash[1..];
    let Some(target) = page.with_document(|doc| doc.get_element_by_id(id)) else {
        debug!("Smooth scroll target {hash} not found");
        if let Some(callback) = on_complete {
            callback();
        }
        return;
    };

    let start = page.scroll_top();
    let destination = (page.offset_top(target) - options.offset).max(0.0);
    let change = destination - start;
    let duration = options.duration_ms;
    debug!("Smooth scroll to {hash}: {start} -> {destination} over {duration}ms");

    let mut scheduled = Vec::new();
    let mut elapsed = FRAME_MS;
    while elapsed < duration {
        let weak = page.downgrade();
        let top = ease_in_out_cubic(elapsed as f64, start, change, duration as f64);
        scheduled.push(page.set_timeout(elapsed, move || {
            if let Some(page) = weak.upgrade() {
                page.scroll_to(top);
            }
        }));
        elapsed += FRAME_MS;
    }

    let weak = page.downgrade();
    let hash = hash.to_string();
    let pending = Rc::downgrade(frames);
    scheduled.push(page.set_timeout(duration, move || {
        if let Some(frames) = pending.upgrade() {
            frames.borrow_mut().clear();
        }
        let Some(page) = weak.upgrade() else {
            return;
        };
        page.scroll_to(destination);
        page.set_location_hash(&hash);
        if let Some(callback) = on_complete {
            callback();
        }
    }));

    *frames.borrow_mut() = scheduled;
}
