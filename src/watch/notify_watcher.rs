//! `notify`-backed watch adapter.
//!
//! Raw `notify` events are forwarded through a `flume` channel to a dispatcher thread
//! owned by the adapter. The dispatcher turns them into [`WatchEvent`]s:
//!
//! | raw event                         | delivered as                         |
//! |-----------------------------------|--------------------------------------|
//! | create (folder)                   | `Created`                            |
//! | remove (not a file)               | `Deleted`                            |
//! | rename `Both`                     | `Renamed`                            |
//! | rename `From` + `To`              | `Renamed`                            |
//! | rename `From` alone (moved out)   | `Deleted` once the pair window ends  |
//! | rename `To` alone (moved in)      | `Created`                            |
//! | rename `Any`                      | `Created` or `Deleted` by existence  |
//!
//! Backends that report both halves and a combined `Both` event (inotify) produce a single
//! `Renamed`, since the combined event is recognized as a duplicate of the paired halves.

use super::{DeliveryGate, EventSink, WatchAdapter, WatchEvent, WatchSource};
use crate::error::{ModListError, Result};
use crate::models::WatchSettings;
use camino::{Utf8Path, Utf8PathBuf};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Upper bound on how long the dispatcher sleeps before checking for shutdown
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Watches real directories through the platform's recommended `notify` backend
#[derive(Debug, Clone)]
pub struct NotifyWatchSource {
    rename_pair_window: Duration,
}

impl NotifyWatchSource {
    pub fn new(settings: &WatchSettings) -> Self {
        Self {
            rename_pair_window: settings.rename_pair_window(),
        }
    }
}

impl Default for NotifyWatchSource {
    fn default() -> Self {
        Self::new(&WatchSettings::default())
    }
}

impl WatchSource for NotifyWatchSource {
    fn watch(&self, root: &Utf8Path, sink: EventSink) -> Result<Box<dyn WatchAdapter>> {
        let (tx, rx) = flume::unbounded();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            // A closed channel means the adapter is shutting down
            let _ = tx.send(res);
        })
        .map_err(|e| ModListError::Watcher(format!("Failed to create watcher for {root}: {e}")))?;

        watcher
            .watch(root.as_std_path(), RecursiveMode::NonRecursive)
            .map_err(|e| ModListError::Watcher(format!("Failed to watch {root}: {e}")))?;

        let gate = Arc::new(DeliveryGate::new());
        let stop = Arc::new(AtomicBool::new(false));
        let dispatcher = Dispatcher {
            root: root.to_path_buf(),
            sink,
            gate: gate.clone(),
            stop: stop.clone(),
            pair_window: self.rename_pair_window,
            pending_from: Vec::new(),
            recent_renames: Vec::new(),
        };

        let handle = thread::Builder::new()
            .name("modlist-watch".to_string())
            .spawn(move || dispatcher.run(rx))
            .map_err(|e| ModListError::io("Failed to spawn watcher dispatch thread", e))?;

        tracing::debug!(path = %root, "Started watching mods folder");

        Ok(Box::new(NotifyWatchAdapter {
            root: root.to_path_buf(),
            watcher: Some(watcher),
            gate,
            stop,
            dispatcher: Some(handle),
        }))
    }
}

struct NotifyWatchAdapter {
    root: Utf8PathBuf,
    watcher: Option<RecommendedWatcher>,
    gate: Arc<DeliveryGate>,
    stop: Arc<AtomicBool>,
    dispatcher: Option<JoinHandle<()>>,
}

impl WatchAdapter for NotifyWatchAdapter {
    fn set_raising_events(&self, enabled: bool) {
        self.gate.set_raising(enabled);
    }

    fn is_raising_events(&self) -> bool {
        self.gate.is_raising()
    }

    fn take_discarded(&self) -> Vec<WatchEvent> {
        self.gate.take_discarded()
    }

    fn dispose(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.gate.set_raising(false);
        drop(self.watcher.take());

        if let Some(handle) = self.dispatcher.take() {
            // Disposal can be triggered from an observer running on the dispatcher itself
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                tracing::error!(path = %self.root, "Watcher dispatch thread panicked");
            }
            tracing::debug!(path = %self.root, "Stopped watching mods folder");
        }
    }
}

impl Drop for NotifyWatchAdapter {
    fn drop(&mut self) {
        self.dispose();
    }
}

struct PendingFrom {
    path: Utf8PathBuf,
    tracker: Option<usize>,
    seen_at: Instant,
}

struct RecentRename {
    old: Utf8PathBuf,
    new: Utf8PathBuf,
    seen_at: Instant,
}

struct Dispatcher {
    root: Utf8PathBuf,
    sink: EventSink,
    gate: Arc<DeliveryGate>,
    stop: Arc<AtomicBool>,
    pair_window: Duration,
    pending_from: Vec<PendingFrom>,
    recent_renames: Vec<RecentRename>,
}

impl Dispatcher {
    fn run(mut self, rx: flume::Receiver<notify::Result<Event>>) {
        let poll_interval = self
            .pair_window
            .clamp(Duration::from_millis(1), MAX_POLL_INTERVAL);

        while !self.stop.load(Ordering::Acquire) {
            match rx.recv_timeout(poll_interval) {
                Ok(Ok(event)) => self.handle(event),
                Ok(Err(err)) => self.deliver(WatchEvent::Error(err.to_string())),
                Err(flume::RecvTimeoutError::Timeout) => {}
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
            self.expire(Instant::now());
        }
    }

    fn handle(&mut self, event: Event) {
        let tracker = event.tracker();
        match event.kind {
            EventKind::Create(CreateKind::File) => {}
            EventKind::Create(kind) => {
                for path in self.children(&event.paths) {
                    if kind == CreateKind::Folder || path.is_dir() {
                        self.deliver(WatchEvent::Created(path));
                    }
                }
            }
            EventKind::Remove(RemoveKind::File) => {}
            EventKind::Remove(_) => {
                if event.paths.iter().any(|p| p == self.root.as_std_path()) {
                    self.deliver(WatchEvent::Error(format!(
                        "Watched folder {} was removed",
                        self.root
                    )));
                }
                for path in self.children(&event.paths) {
                    self.deliver(WatchEvent::Deleted(path));
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => {
                self.handle_rename(mode, &event.paths, tracker);
            }
            _ => {}
        }
    }

    fn handle_rename(&mut self, mode: RenameMode, paths: &[PathBuf], tracker: Option<usize>) {
        match mode {
            RenameMode::From => {
                let seen_at = Instant::now();
                for path in self.children(paths) {
                    self.pending_from.push(PendingFrom {
                        path,
                        tracker,
                        seen_at,
                    });
                }
            }
            RenameMode::To => {
                for path in self.children(paths) {
                    match self.take_pending_from(tracker) {
                        Some(from) => {
                            self.recent_renames.push(RecentRename {
                                old: from.path.clone(),
                                new: path.clone(),
                                seen_at: Instant::now(),
                            });
                            self.deliver(WatchEvent::Renamed {
                                old: from.path,
                                new: path,
                            });
                        }
                        None if path.is_dir() => self.deliver(WatchEvent::Created(path)),
                        None => {}
                    }
                }
            }
            RenameMode::Both => {
                let old = paths.first().and_then(|p| self.child(p));
                let new = paths.get(1).and_then(|p| self.child(p));
                match (old, new) {
                    (Some(old), Some(new)) => {
                        if self.take_recent_rename(&old, &new) {
                            return;
                        }
                        self.pending_from.retain(|pending| pending.path != old);
                        self.deliver(WatchEvent::Renamed { old, new });
                    }
                    (Some(old), None) => {
                        self.pending_from.retain(|pending| pending.path != old);
                        self.deliver(WatchEvent::Deleted(old));
                    }
                    (None, Some(new)) if new.is_dir() => self.deliver(WatchEvent::Created(new)),
                    _ => {}
                }
            }
            RenameMode::Any | RenameMode::Other => {
                for path in self.children(paths) {
                    if !path.exists() {
                        self.deliver(WatchEvent::Deleted(path));
                    } else if path.is_dir() {
                        self.deliver(WatchEvent::Created(path));
                    }
                }
            }
        }
    }

    fn take_pending_from(&mut self, tracker: Option<usize>) -> Option<PendingFrom> {
        let index = self
            .pending_from
            .iter()
            .position(|pending| tracker.is_none() || pending.tracker == tracker)?;
        Some(self.pending_from.remove(index))
    }

    fn take_recent_rename(&mut self, old: &Utf8Path, new: &Utf8Path) -> bool {
        match self
            .recent_renames
            .iter()
            .position(|recent| recent.old == old && recent.new == new)
        {
            Some(index) => {
                self.recent_renames.remove(index);
                true
            }
            None => false,
        }
    }

    /// Flush rename halves whose partner never arrived
    fn expire(&mut self, now: Instant) {
        let window = self.pair_window;
        self.recent_renames
            .retain(|recent| now.duration_since(recent.seen_at) < window);

        let (expired, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_from)
            .into_iter()
            .partition(|pending| now.duration_since(pending.seen_at) >= window);
        self.pending_from = pending;

        for from in expired {
            self.deliver(WatchEvent::Deleted(from.path));
        }
    }

    fn deliver(&self, event: WatchEvent) {
        match self.gate.admit(event) {
            Some(event) => (self.sink)(event),
            None => tracing::trace!("Watcher paused, dropping event"),
        }
    }

    fn children(&self, paths: &[PathBuf]) -> Vec<Utf8PathBuf> {
        paths.iter().filter_map(|path| self.child(path)).collect()
    }

    /// `path` as UTF-8 if it is a direct child of the watched folder
    fn child(&self, path: &std::path::Path) -> Option<Utf8PathBuf> {
        let Some(path) = Utf8Path::from_path(path) else {
            tracing::warn!(path = %path.display(), "Ignoring non UTF-8 path");
            return None;
        };
        (path.parent() == Some(self.root.as_path())).then(|| path.to_path_buf())
    }
}
