use crate::watch::{WatchAdapter, WatchEvent};
use camino::Utf8PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Gate that keeps a mod list from reprocessing its own disk mutations
///
/// While a [`SuppressionGuard`] is alive, watcher delivery is paused at the adapter and
/// any event that still reaches the list is dropped. OS notifications are asynchronous,
/// so the echo of a mutation can arrive after the guard is gone; each guard therefore
/// records the events its mutation is expected to produce, and matching events seen
/// within the echo window are discarded as well.
///
/// Echoes of one mutation form a group. A rename is expected either as one `Renamed`
/// event or as `Deleted(old)` followed by `Created(new)`, depending on what the platform
/// reports. Any other event naming a path of a pending group means the disk has moved
/// on, so the whole group is forgotten.
pub(crate) struct Suppression {
    active: AtomicBool,
    echoes: Mutex<Vec<ExpectedEcho>>,
    echo_window: Duration,
    next_group: AtomicU64,
}

struct ExpectedEcho {
    event: WatchEvent,
    group: u64,
    expires_at: Instant,
}

impl Suppression {
    pub(crate) fn new(echo_window: Duration) -> Self {
        Self {
            active: AtomicBool::new(false),
            echoes: Mutex::new(Vec::new()),
            echo_window,
            next_group: AtomicU64::new(0),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Suppress until the returned guard is dropped.
    ///
    /// Callers must hold the mod list's write lock for the guard's whole lifetime.
    pub(crate) fn begin<'a>(
        &'a self,
        watcher: &'a Mutex<Option<Box<dyn WatchAdapter>>>,
    ) -> SuppressionGuard<'a> {
        self.active.store(true, Ordering::Release);
        set_raising(watcher, false);
        SuppressionGuard {
            suppression: self,
            watcher,
            groups: Vec::new(),
        }
    }

    /// Remove and report an expected echo matching `event`
    ///
    /// A matched `Renamed` settles its whole group. A matched half of the split form
    /// only rules out the `Renamed` form, so the other half stays expected.
    pub(crate) fn consume_echo(&self, event: &WatchEvent) -> bool {
        let mut echoes = self.lock_echoes();
        let Some(index) = echoes.iter().position(|echo| &echo.event == event) else {
            return false;
        };

        let consumed = echoes.remove(index);
        let whole_group = matches!(consumed.event, WatchEvent::Renamed { .. });
        echoes.retain(|echo| {
            echo.group != consumed.group
                || !(whole_group || matches!(echo.event, WatchEvent::Renamed { .. }))
        });
        true
    }

    /// Forget every pending group with an echo naming a path of `event`
    pub(crate) fn invalidate(&self, event: &WatchEvent) {
        let paths: Vec<Utf8PathBuf> = match event {
            WatchEvent::Created(path) | WatchEvent::Deleted(path) => vec![path.clone()],
            WatchEvent::Renamed { old, new } => vec![old.clone(), new.clone()],
            WatchEvent::Error(_) => return,
        };

        let mut echoes = self.lock_echoes();
        let stale: Vec<u64> = echoes
            .iter()
            .filter(|echo| paths.iter().any(|path| echo.event.touches(path)))
            .map(|echo| echo.group)
            .collect();
        if !stale.is_empty() {
            tracing::debug!(?event, groups = stale.len(), "Dropping stale expected echoes");
            echoes.retain(|echo| !stale.contains(&echo.group));
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_echoes(&self) -> usize {
        self.lock_echoes().len()
    }

    /// Lock the ledger with expired echoes already pruned
    fn lock_echoes(&self) -> std::sync::MutexGuard<'_, Vec<ExpectedEcho>> {
        let now = Instant::now();
        let mut echoes = self.echoes.lock().unwrap_or_else(PoisonError::into_inner);
        echoes.retain(|echo| echo.expires_at > now);
        echoes
    }
}

/// Scoped suppression; dropping it resumes watcher delivery on every exit path
pub(crate) struct SuppressionGuard<'a> {
    suppression: &'a Suppression,
    watcher: &'a Mutex<Option<Box<dyn WatchAdapter>>>,
    groups: Vec<Vec<WatchEvent>>,
}

impl SuppressionGuard<'_> {
    /// Record an event the guarded mutation will cause once it has succeeded
    pub(crate) fn expect_echo(&mut self, event: WatchEvent) {
        self.groups.push(vec![event]);
    }

    /// Record the echo of a folder rename in both of its reported forms
    pub(crate) fn expect_rename_echo(&mut self, old: Utf8PathBuf, new: Utf8PathBuf) {
        self.groups.push(vec![
            WatchEvent::Renamed {
                old: old.clone(),
                new: new.clone(),
            },
            WatchEvent::Deleted(old),
            WatchEvent::Created(new),
        ]);
    }
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        let suppression = self.suppression;

        if !self.groups.is_empty() {
            let expires_at = Instant::now() + suppression.echo_window;
            let mut echoes = suppression.lock_echoes();
            for events in self.groups.drain(..) {
                let group = suppression.next_group.fetch_add(1, Ordering::Relaxed);
                echoes.extend(events.into_iter().map(|event| ExpectedEcho {
                    event,
                    group,
                    expires_at,
                }));
            }
        }

        // Echoes the adapter dropped while paused will never be delivered
        let discarded = {
            let watcher = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
            match watcher.as_ref() {
                Some(watcher) => {
                    watcher.set_raising_events(true);
                    watcher.take_discarded()
                }
                None => Vec::new(),
            }
        };
        for event in &discarded {
            suppression.consume_echo(event);
        }

        suppression.active.store(false, Ordering::Release);
    }
}

fn set_raising(watcher: &Mutex<Option<Box<dyn WatchAdapter>>>, enabled: bool) {
    let watcher = watcher.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(watcher) = watcher.as_ref() {
        watcher.set_raising_events(enabled);
    }
}
