// Mod list metrics
//
// Lightweight counters for watcher traffic and programmatic mutations of one mod list

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per mod list counters
///
/// Uses atomic operations so the watcher thread and callers can record without locks.
/// Logged on shutdown, or periodically by long-running hosts.
#[derive(Debug)]
pub struct Metrics {
    /// Watcher events applied to the in-memory collection
    pub events_reconciled: AtomicU64,

    /// Watcher events dropped because suppression was active
    pub events_suppressed: AtomicU64,

    /// Late notifications of the list's own mutations that were discarded
    pub echoes_discarded: AtomicU64,

    /// Errors reported by the watcher
    pub watcher_errors: AtomicU64,

    /// Folders renamed by enable/disable
    pub renames: AtomicU64,

    /// Folders deleted or recycled through the list
    pub deletions: AtomicU64,

    /// Domain events published to observers
    pub events_published: AtomicU64,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            events_reconciled: AtomicU64::new(0),
            events_suppressed: AtomicU64::new(0),
            echoes_discarded: AtomicU64::new(0),
            watcher_errors: AtomicU64::new(0),
            renames: AtomicU64::new(0),
            deletions: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_reconciled(&self) {
        self.events_reconciled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.events_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_echo_discarded(&self) {
        self.echoes_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_watcher_error(&self) {
        self.watcher_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rename(&self) {
        self.renames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_deletion(&self) {
        self.deletions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Watcher events dropped either by suppression or as echoes
    pub fn self_events_ignored(&self) -> u64 {
        self.events_suppressed.load(Ordering::Relaxed) + self.echoes_discarded.load(Ordering::Relaxed)
    }

    /// Log metrics summary
    pub fn log_summary(&self, character: &str) {
        tracing::info!(
            character,
            uptime_secs = self.uptime().as_secs_f64(),
            reconciled = self.events_reconciled.load(Ordering::Relaxed),
            suppressed = self.events_suppressed.load(Ordering::Relaxed),
            echoes = self.echoes_discarded.load(Ordering::Relaxed),
            watcher_errors = self.watcher_errors.load(Ordering::Relaxed),
            "Watcher metrics"
        );
        tracing::info!(
            character,
            renames = self.renames.load(Ordering::Relaxed),
            deletions = self.deletions.load(Ordering::Relaxed),
            published = self.events_published.load(Ordering::Relaxed),
            "Mutation metrics"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.events_reconciled.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.self_events_ignored(), 0);
    }

    #[test]
    fn test_record_watcher_traffic() {
        let metrics = Metrics::new();

        metrics.record_reconciled();
        metrics.record_reconciled();
        metrics.record_suppressed();
        metrics.record_echo_discarded();
        metrics.record_watcher_error();

        assert_eq!(metrics.events_reconciled.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.watcher_errors.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.self_events_ignored(), 2);
    }

    #[test]
    fn test_record_mutations() {
        let metrics = Metrics::new();

        metrics.record_rename();
        metrics.record_deletion();
        metrics.record_published();
        metrics.record_published();

        assert_eq!(metrics.renames.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.deletions.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.events_published.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
