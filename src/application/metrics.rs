//! Observability metrics for pipeline runs.
//!
//! Counts how runs ended and how many events they produced, so a run that
//! saw no change can be told apart from one that changed the view but
//! emitted nothing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics tracking synchronization statistics.
///
/// All metrics use atomic operations for thread-safe updates and reads.
/// Cloning shares the underlying counters.
#[derive(Debug, Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    /// Runs skipped because nothing was marked changed
    runs_idle: AtomicU64,
    /// Runs where the merged view did not change
    runs_unchanged: AtomicU64,
    /// Runs where every change was suppressed
    runs_suppressed: AtomicU64,
    /// Runs that changed the view but no config
    runs_without_events: AtomicU64,
    /// Runs that emitted at least one event
    runs_emitted: AtomicU64,
    /// Diff entries or service removals withheld by suppression
    changes_withheld: AtomicU64,
    events_added: AtomicU64,
    events_updated: AtomicU64,
    events_deleted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics tracker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    pub(crate) fn record_idle(&self) {
        self.inner.runs_idle.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unchanged(&self) {
        self.inner.runs_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_suppressed(&self) {
        self.inner.runs_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_without_events(&self) {
        self.inner.runs_without_events.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_withheld(&self, count: usize) {
        self.inner
            .changes_withheld
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_emitted(&self, added: usize, updated: usize, deleted: usize) {
        self.inner.runs_emitted.fetch_add(1, Ordering::Relaxed);
        self.inner
            .events_added
            .fetch_add(added as u64, Ordering::Relaxed);
        self.inner
            .events_updated
            .fetch_add(updated as u64, Ordering::Relaxed);
        self.inner
            .events_deleted
            .fetch_add(deleted as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            runs_idle: load(&self.inner.runs_idle),
            runs_unchanged: load(&self.inner.runs_unchanged),
            runs_suppressed: load(&self.inner.runs_suppressed),
            runs_without_events: load(&self.inner.runs_without_events),
            runs_emitted: load(&self.inner.runs_emitted),
            changes_withheld: load(&self.inner.changes_withheld),
            events_added: load(&self.inner.events_added),
            events_updated: load(&self.inner.events_updated),
            events_deleted: load(&self.inner.events_deleted),
        }
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        let inner = &self.inner;
        for counter in [
            &inner.runs_idle,
            &inner.runs_unchanged,
            &inner.runs_suppressed,
            &inner.runs_without_events,
            &inner.runs_emitted,
            &inner.changes_withheld,
            &inner.events_added,
            &inner.events_updated,
            &inner.events_deleted,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Runs skipped because nothing was marked changed
    pub runs_idle: u64,
    /// Runs where the merged view did not change
    pub runs_unchanged: u64,
    /// Runs where every change was suppressed
    pub runs_suppressed: u64,
    /// Runs that changed the view but no config
    pub runs_without_events: u64,
    /// Runs that emitted at least one event
    pub runs_emitted: u64,
    /// Diff entries or service removals withheld by suppression
    pub changes_withheld: u64,
    /// Added events emitted
    pub events_added: u64,
    /// Updated events emitted
    pub events_updated: u64,
    /// Deleted events emitted
    pub events_deleted: u64,
}

impl MetricsSnapshot {
    /// Total runs observed.
    pub fn total_runs(&self) -> u64 {
        self.runs_idle
            .saturating_add(self.runs_unchanged)
            .saturating_add(self.runs_suppressed)
            .saturating_add(self.runs_without_events)
            .saturating_add(self.runs_emitted)
    }

    /// Total events emitted.
    pub fn total_events(&self) -> u64 {
        self.events_added
            .saturating_add(self.events_updated)
            .saturating_add(self.events_deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initial_state() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_record_outcomes() {
        let metrics = Metrics::new();
        metrics.record_idle();
        metrics.record_unchanged();
        metrics.record_suppressed();
        metrics.record_without_events();
        metrics.record_emitted(2, 1, 3);
        metrics.record_withheld(4);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_runs(), 5);
        assert_eq!(snapshot.total_events(), 6);
        assert_eq!(snapshot.events_deleted, 3);
        assert_eq!(snapshot.changes_withheld, 4);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_emitted(1, 1, 1);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_clone() {
        let metrics1 = Metrics::new();
        metrics1.record_idle();

        let metrics2 = metrics1.clone();
        metrics2.record_idle();

        // Both should see the same value (shared Arc)
        assert_eq!(metrics1.snapshot().runs_idle, 2);
    }

    #[test]
    fn test_concurrent_updates() {
        use std::thread;

        let metrics = Metrics::new();
        let mut handles = vec![];

        for _ in 0..10 {
            let m = metrics.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.record_emitted(1, 0, 0);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(metrics.snapshot().events_added, 1000);
    }
}
