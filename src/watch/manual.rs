use super::{DeliveryGate, EventSink, WatchAdapter, WatchEvent, WatchSource};
use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Watch source driven by explicit [`emit`](Self::emit) calls
///
/// Delivery is synchronous on the calling thread, which makes the ordering between
/// caller operations and watcher events fully deterministic. Cloned handles share the
/// same subscriptions. A source that never emits is also how one-shot tools open a mod
/// list without an OS watcher.
#[derive(Clone, Default)]
pub struct ManualWatchSource {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

struct Subscription {
    root: Utf8PathBuf,
    sink: EventSink,
    state: Arc<SubscriptionState>,
}

struct SubscriptionState {
    gate: DeliveryGate,
    disposed: AtomicBool,
}

impl ManualWatchSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to the subscription watching the event's parent directory.
    ///
    /// [`WatchEvent::Error`] goes to every subscription. Returns `true` if at least one
    /// sink received the event, `false` if nobody is watching or delivery is paused.
    pub fn emit(&self, event: WatchEvent) -> bool {
        let targets: Vec<(EventSink, Arc<SubscriptionState>)> = {
            let mut subscriptions = self
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscriptions.retain(|subscription| !subscription.state.disposed.load(Ordering::Acquire));

            let parent = event.path().and_then(Utf8Path::parent);
            subscriptions
                .iter()
                .filter(|subscription| {
                    parent.is_none_or(|parent| parent == subscription.root.as_path())
                })
                .map(|subscription| (subscription.sink.clone(), subscription.state.clone()))
                .collect()
        };

        let mut delivered = false;
        for (sink, state) in targets {
            if state.disposed.load(Ordering::Acquire) {
                continue;
            }
            if let Some(event) = state.gate.admit(event.clone()) {
                sink(event);
                delivered = true;
            }
        }
        delivered
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|subscription| !subscription.state.disposed.load(Ordering::Acquire))
            .count()
    }
}

impl WatchSource for ManualWatchSource {
    fn watch(&self, root: &Utf8Path, sink: EventSink) -> Result<Box<dyn WatchAdapter>> {
        let state = Arc::new(SubscriptionState {
            gate: DeliveryGate::new(),
            disposed: AtomicBool::new(false),
        });

        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscription {
                root: root.to_path_buf(),
                sink,
                state: state.clone(),
            });

        Ok(Box::new(ManualWatcher { state }))
    }
}

struct ManualWatcher {
    state: Arc<SubscriptionState>,
}

impl WatchAdapter for ManualWatcher {
    fn set_raising_events(&self, enabled: bool) {
        self.state.gate.set_raising(enabled);
    }

    fn is_raising_events(&self) -> bool {
        self.state.gate.is_raising()
    }

    fn take_discarded(&self) -> Vec<WatchEvent> {
        self.state.gate.take_discarded()
    }

    fn dispose(&mut self) {
        self.state.disposed.store(true, Ordering::Release);
    }
}

impl Drop for ManualWatcher {
    fn drop(&mut self) {
        self.dispose();
    }
}
