//! Directory watching.
//!
//! A [`ModList`](crate::state::ModList) never talks to an OS notification API directly. It
//! asks a [`WatchSource`] to watch its root directory, hands over an [`EventSink`], and
//! keeps the returned [`WatchAdapter`] for its whole lifetime.
//!
//! Two sources ship with the crate:
//! - [`NotifyWatchSource`]: non-recursive watching of a real directory through `notify`
//! - [`ManualWatchSource`]: events are injected by the caller, delivered synchronously

pub mod manual;
pub mod notify_watcher;

pub use manual::ManualWatchSource;
pub use notify_watcher::NotifyWatchSource;

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Upper bound on events remembered while delivery is paused
const MAX_DISCARDED: usize = 1024;

/// A change observed in a watched directory
///
/// Paths are absolute and always direct children of the watched directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchEvent {
    Created(Utf8PathBuf),
    Deleted(Utf8PathBuf),
    Renamed { old: Utf8PathBuf, new: Utf8PathBuf },
    /// The notification source failed; later deliveries may be incomplete
    Error(String),
}

impl WatchEvent {
    /// Path the event concerns after the change, if any
    pub fn path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Created(path) | Self::Deleted(path) => Some(path),
            Self::Renamed { new, .. } => Some(new),
            Self::Error(_) => None,
        }
    }

    /// True if the event names `path` as its old or new location
    pub fn touches(&self, path: &Utf8Path) -> bool {
        match self {
            Self::Created(p) | Self::Deleted(p) => p == path,
            Self::Renamed { old, new } => old == path || new == path,
            Self::Error(_) => false,
        }
    }
}

/// Callback a watch adapter delivers events to
pub type EventSink = Arc<dyn Fn(WatchEvent) + Send + Sync>;

/// A live subscription to one directory
pub trait WatchAdapter: Send {
    /// Pause or resume delivery. Events raised while paused are dropped, not queued.
    fn set_raising_events(&self, enabled: bool);

    fn is_raising_events(&self) -> bool;

    /// Take the events dropped since delivery was last paused. Errors are not kept.
    fn take_discarded(&self) -> Vec<WatchEvent>;

    /// Stop delivery permanently and release OS resources
    fn dispose(&mut self);
}

/// Creates watch adapters
pub trait WatchSource {
    /// Start watching `root` non-recursively, delivering events to `sink`
    fn watch(&self, root: &Utf8Path, sink: EventSink) -> Result<Box<dyn WatchAdapter>>;
}

/// Pause switch shared by an adapter and the thread raising its events
///
/// Checking the switch and recording a dropped event happen under one lock, so an event
/// is either delivered or shows up in [`take_discarded`](Self::take_discarded) after
/// delivery resumes, never neither.
pub(crate) struct DeliveryGate {
    state: Mutex<GateState>,
}

struct GateState {
    raising: bool,
    discarded: Vec<WatchEvent>,
}

impl DeliveryGate {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                raising: true,
                discarded: Vec::new(),
            }),
        }
    }

    /// Pausing starts a fresh record of dropped events
    pub(crate) fn set_raising(&self, enabled: bool) {
        let mut state = self.lock();
        if !enabled {
            state.discarded.clear();
        }
        state.raising = enabled;
    }

    pub(crate) fn is_raising(&self) -> bool {
        self.lock().raising
    }

    /// Hand `event` back for delivery, or record it as dropped while paused
    pub(crate) fn admit(&self, event: WatchEvent) -> Option<WatchEvent> {
        let mut state = self.lock();
        if state.raising {
            return Some(event);
        }
        if !matches!(event, WatchEvent::Error(_)) && state.discarded.len() < MAX_DISCARDED {
            state.discarded.push(event);
        }
        None
    }

    pub(crate) fn take_discarded(&self) -> Vec<WatchEvent> {
        std::mem::take(&mut self.lock().discarded)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
