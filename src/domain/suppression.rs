//! Cool-down suppression of dependency removals.
//!
//! Dependency observations flap: a call edge can vanish and reappear within
//! seconds. The [`Suppressor`] withholds removals for applications whose
//! last recorded diff is younger than the cool-down window. Additions are
//! never withheld.

use crate::domain::diff::{Diff, DiffEntry};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Time each application last appeared in a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateTimestamps {
    inner: BTreeMap<String, Instant>,
}

impl UpdateTimestamps {
    /// Create an empty timestamp table.
    pub fn new() -> Self {
        Self::default()
    }

    /// When `application` last appeared in a diff, if ever.
    pub fn get(&self, application: &str) -> Option<Instant> {
        self.inner.get(application).copied()
    }

    /// Record that `application` appeared in a diff at `now`.
    pub fn record(&mut self, application: impl Into<String>, now: Instant) {
        self.inner.insert(application.into(), now);
    }

    /// Number of tracked applications.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no application is tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Result of a suppression pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuppressionOutcome {
    /// Whole-application deletions withheld
    pub apps_withheld: usize,
    /// Individual service removals withheld
    pub removals_withheld: usize,
    /// Partial updates dropped because nothing remained after pruning
    pub entries_emptied: usize,
}

impl SuppressionOutcome {
    /// Whether anything was pruned.
    pub fn changed(&self) -> bool {
        self.apps_withheld > 0 || self.removals_withheld > 0 || self.entries_emptied > 0
    }
}

/// Filters flappy deletions out of a diff.
///
/// # Example
/// ```
/// use sidecar_sync::{CallModel, Diff, GlobalView, Suppressor, UpdateTimestamps};
/// use std::time::{Duration, Instant};
///
/// let now = Instant::now();
/// let prev: GlobalView = [("app1".to_string(), CallModel::new("app1").with_consumes(["svcA"]))]
///     .into_iter()
///     .collect();
/// let cur: GlobalView = [("app1".to_string(), CallModel::new("app1"))].into_iter().collect();
///
/// let mut timestamps = UpdateTimestamps::new();
/// timestamps.record("app1", now);
///
/// let mut diff = Diff::between(&prev, &cur);
/// let outcome = Suppressor::new(Duration::from_secs(30)).suppress(&mut diff, &mut timestamps, now);
///
/// assert!(outcome.changed());
/// assert!(diff.is_empty());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suppressor {
    window: Duration,
}

impl Suppressor {
    /// Create a suppressor with the given cool-down window.
    ///
    /// A zero window disables suppression.
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// The cool-down window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether `application` is still cooling down at `now`.
    fn cooling_down(&self, timestamps: &UpdateTimestamps, application: &str, now: Instant) -> bool {
        match timestamps.get(application) {
            Some(last) => now.saturating_duration_since(last) < self.window,
            None => false,
        }
    }

    /// Prune withheld deletions from `diff` in place.
    ///
    /// The window is judged against the timestamps as they were before this
    /// call; afterwards every application present in the input diff is
    /// stamped with `now`.
    pub fn suppress(
        &self,
        diff: &mut Diff,
        timestamps: &mut UpdateTimestamps,
        now: Instant,
    ) -> SuppressionOutcome {
        let mut outcome = SuppressionOutcome::default();
        let touched: Vec<String> = diff.applications().map(str::to_owned).collect();

        if !self.window.is_zero() {
            diff.retain(|app, entry| {
                let trim = self.cooling_down(&*timestamps, app, now);
                match entry {
                    DiffEntry::Added(_) => true,
                    DiffEntry::Deleted(_) => {
                        if trim {
                            outcome.apps_withheld += 1;
                        }
                        !trim
                    }
                    DiffEntry::Consumes(changes) => {
                        if trim {
                            let before = changes.len();
                            changes.retain(|change| !change.is_removal());
                            outcome.removals_withheld += before - changes.len();
                        }
                        if changes.is_empty() {
                            outcome.entries_emptied += 1;
                            return false;
                        }
                        true
                    }
                }
            });
        }

        for app in touched {
            timestamps.record(app, now);
        }

        outcome
    }
}
