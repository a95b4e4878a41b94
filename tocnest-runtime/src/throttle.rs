//! Leading-edge throttle with a deferred trailing call

use std::cell::Cell;
use std::rc::Rc;

use crate::page::{Page, TimerId};

#[derive(Default)]
struct ThrottleState {
    last: Cell<Option<u64>>,
    deferred: Cell<Option<TimerId>>,
}

/// Runs an action at most once per `threshold_ms`.
///
/// The first call runs immediately. Calls inside the window replace any
/// pending deferred call, which runs `threshold_ms` after the latest of them,
/// so the last update of a burst is never lost.
pub struct Throttle {
    threshold_ms: u64,
    state: Rc<ThrottleState>,
}

impl Throttle {
    pub fn new(threshold_ms: u64) -> Self {
        Self {
            threshold_ms,
            state: Rc::default(),
        }
    }

    pub fn call(&self, page: &Page, action: impl FnOnce() + 'static) {
        let now = page.now();
        let within = self
            .state
            .last
            .get()
            .is_some_and(|last| now < last.saturating_add(self.threshold_ms));

        if !within {
            self.state.last.set(Some(now));
            action();
            return;
        }

        self.cancel(page);
        let state = Rc::downgrade(&self.state);
        let timer = page.set_timeout(self.threshold_ms, move || {
            if let Some(state) = state.upgrade() {
                state.last.set(Some(now));
                state.deferred.set(None);
            }
            action();
        });
        self.state.deferred.set(Some(timer));
    }

    /// True while a trailing call is scheduled
    pub fn is_pending(&self) -> bool {
        self.state.deferred.get().is_some()
    }

    /// Drop the pending trailing call, if any
    pub fn cancel(&self, page: &Page) {
        if let Some(timer) = self.state.deferred.take() {
            page.clear_timeout(timer);
        }
    }
}
