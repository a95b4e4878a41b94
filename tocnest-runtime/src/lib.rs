//! tocnest runtime - a table of contents living on a page
//!
//! This crate wires the core pipeline to a host page:
//! - Page host with listeners, layout offsets and a timer queue
//! - Lifecycle controller (init, refresh, destroy)
//! - Throttled scroll/resize/click tracking and smooth scrolling
//! - File watching for sources that change on disk

pub mod controller;
pub mod event;
pub mod page;
pub mod smooth_scroll;
pub mod throttle;

#[cfg(feature = "watch")]
pub mod watcher;

// Re-export main types
pub use controller::{Hooks, State, TableOfContents};
pub use event::{Event, EventKind, EventTarget, Subscription};
pub use page::Page;
