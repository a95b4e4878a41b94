//! Watching a source file so the table of contents can follow edits

use anyhow::{bail, Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// What happened to the watched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    Changed,
    Removed,
}

/// Collapses a burst of events into one, once things have been quiet for a while
#[derive(Debug, Default, Clone)]
pub struct Debounce {
    last_event: Option<Instant>,
}

impl Debounce {
    pub fn note(&mut self, at: Instant) {
        self.last_event = Some(at);
    }

    pub fn is_pending(&self) -> bool {
        self.last_event.is_some()
    }

    /// True once, when `quiet` has passed since the last noted event
    pub fn fire(&mut self, now: Instant, quiet: Duration) -> bool {
        match self.last_event {
            Some(last) if now.saturating_duration_since(last) >= quiet => {
                self.last_event = None;
                true
            }
            _ => false,
        }
    }
}

/// Watches one file; editors that save by renaming are covered by also
/// watching the parent directory.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<SourceEvent>,
    watched_path: PathBuf,
    debounce: Debounce,
    removed: bool,
}

impl SourceWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let watched_path = path.to_path_buf();
        let target = watched_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!("File watch error: {err}");
                    return;
                }
            };
            if !event.paths.iter().any(|p| p == &target) {
                return;
            }
            let change = match event.kind {
                EventKind::Modify(_) | EventKind::Create(_) => SourceEvent::Changed,
                EventKind::Remove(_) => SourceEvent::Removed,
                _ => return,
            };
            let _ = tx.send(change);
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch file: {}", path.display()))?;
        if let Some(parent) = path.parent() {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .context("Failed to watch parent directory")?;
        }
        debug!("Watching {}", path.display());

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
            watched_path,
            debounce: Debounce::default(),
            removed: false,
        })
    }

    fn drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            self.record(event);
        }
    }

    fn record(&mut self, event: SourceEvent) {
        // A later create or modify means the file is back
        self.removed = event == SourceEvent::Removed;
        self.debounce.note(Instant::now());
    }

    /// True when a change arrived and `debounce_ms` have passed without another
    pub fn check_changed(&mut self, debounce_ms: u64) -> bool {
        self.drain();
        self.debounce
            .fire(Instant::now(), Duration::from_millis(debounce_ms))
    }

    /// Block until a debounced change is ready or `timeout` runs out
    pub fn wait_changed(&mut self, debounce_ms: u64, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.check_changed(debounce_ms) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            let wait = if self.debounce.is_pending() {
                Duration::from_millis(debounce_ms).min(deadline - now)
            } else {
                deadline - now
            };
            match self.receiver.recv_timeout(wait) {
                Ok(event) => self.record(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    bail!("Watcher for {} stopped", self.watched_path.display())
                }
            }
        }
    }

    /// True if the last event seen was a removal
    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn path(&self) -> &Path {
        &self.watched_path
    }
}
