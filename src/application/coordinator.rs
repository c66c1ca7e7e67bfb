//! Pipeline coordination and shared state.
//!
//! The coordinator owns every piece of state the pipeline carries between
//! runs and runs merge → diff → suppress → synthesize → reconcile on
//! demand. State is published as immutable snapshots behind `Arc`s:
//! a run copies references out under a read lock, computes without any
//! lock, then swaps the new snapshots in under a short write lock.

use crate::application::config::SyncConfig;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, EventHandler};
use crate::application::ready::ReadyGate;
use crate::application::reconciler::{reconcile, EmittedCache, Reconciliation};
use crate::domain::call_model::{aggregate, CallModels, GlobalView, SourceId};
use crate::domain::diff::Diff;
use crate::domain::event::ConfigEvent;
use crate::domain::facts::changed_applications;
use crate::domain::sidecar::Synthesizer;
use crate::domain::suppression::{Suppressor, UpdateTimestamps};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn, Span};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Not an initial sync and nothing was marked changed
    Idle,
    /// Applications were marked changed but the merged view is the same
    Unchanged,
    /// The view changed but every change was withheld by suppression
    Suppressed,
    /// The view changed but no derived config did
    NoConfigChange,
    /// Events were dispatched
    Emitted {
        /// Added events
        added: usize,
        /// Updated events
        updated: usize,
        /// Deleted events
        deleted: usize,
    },
}

impl RunOutcome {
    /// Whether this run committed new state.
    pub fn committed(&self) -> bool {
        matches!(self, RunOutcome::NoConfigChange | RunOutcome::Emitted { .. })
    }
}

/// Shared references to the currently published state.
///
/// Published snapshots are never mutated, so they can be read freely after
/// the lock that produced them is released.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Merged call models as of the last committed run
    pub view: Arc<GlobalView>,
    /// What downstream handlers were last told
    pub cache: Arc<EmittedCache>,
}

#[derive(Debug, Default)]
struct SyncState {
    sources: BTreeMap<SourceId, Arc<CallModels>>,
    view: Arc<GlobalView>,
    timestamps: Arc<UpdateTimestamps>,
    cache: Arc<EmittedCache>,
    dirty: BTreeSet<String>,
}

/// Runs the synchronization pipeline and dispatches its events.
///
/// Producers call [`notify`](Self::notify) or
/// [`update_source`](Self::update_source) from any thread. Runs are
/// serialized; producers are only excluded while a run reads and clears
/// the changed set or swaps in its results.
pub struct Coordinator {
    state: RwLock<SyncState>,
    run_lock: Mutex<()>,
    suppressor: Suppressor,
    synthesizer: Synthesizer,
    clock: Arc<dyn Clock>,
    handlers: Vec<Arc<dyn EventHandler>>,
    metrics: Metrics,
    ready: ReadyGate,
    refresh_interval: Duration,
    span: Span,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("suppressor", &self.suppressor)
            .field("synthesizer", &self.synthesizer)
            .field("handlers", &self.handlers.len())
            .field("ready", &self.ready.is_ready())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Create a coordinator.
    ///
    /// `config` is expected to be validated already; prefer
    /// [`CoordinatorBuilder`](crate::CoordinatorBuilder).
    pub fn new(
        config: &SyncConfig,
        clock: Arc<dyn Clock>,
        handlers: Vec<Arc<dyn EventHandler>>,
        span: Span,
    ) -> Self {
        Self {
            state: RwLock::new(SyncState::default()),
            run_lock: Mutex::new(()),
            suppressor: Suppressor::new(config.suppression_window),
            synthesizer: Synthesizer::new(
                config.namespace.clone(),
                config.workload_app_label.clone(),
                config.revision.clone(),
            ),
            clock,
            handlers,
            metrics: Metrics::new(),
            ready: ReadyGate::new(),
            refresh_interval: config.refresh_interval,
            span,
        }
    }

    /// Record that `applications` changed for `source`.
    pub fn notify<I, S>(&self, source: &str, applications: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state.write();
        let before = state.dirty.len();
        state.dirty.extend(applications.into_iter().map(Into::into));
        trace!(
            parent: &self.span,
            source,
            newly_dirty = state.dirty.len() - before,
            "applications marked changed"
        );
    }

    /// Replace the facts contributed by `source` and mark every application
    /// whose model changed. Empty facts remove the source.
    ///
    /// Returns the changed applications.
    pub fn update_source(&self, source: impl Into<SourceId>, facts: CallModels) -> Vec<String> {
        let source = source.into();
        let mut state = self.state.write();

        let changed = match state.sources.get(&source) {
            Some(prev) => changed_applications(prev, &facts),
            None => changed_applications(&CallModels::new(), &facts),
        };

        if facts.is_empty() {
            state.sources.remove(&source);
        } else {
            state.sources.insert(source.clone(), Arc::new(facts));
        }
        state.dirty.extend(changed.iter().cloned());

        trace!(parent: &self.span, %source, changed = changed.len(), "source updated");
        changed
    }

    /// Drop everything `source` contributed and mark its applications.
    pub fn remove_source(&self, source: &str) -> Vec<String> {
        let mut state = self.state.write();
        let Some(prev) = state.sources.remove(source) else {
            return Vec::new();
        };

        let changed: Vec<String> = prev.keys().cloned().collect();
        state.dirty.extend(changed.iter().cloned());

        trace!(parent: &self.span, source, changed = changed.len(), "source removed");
        changed
    }

    /// Number of applications marked changed since the last run.
    pub fn pending_changes(&self) -> usize {
        self.state.read().dirty.len()
    }

    /// Number of sources currently contributing facts.
    pub fn source_count(&self) -> usize {
        self.state.read().sources.len()
    }

    /// References to the current merged view and emitted cache.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.state.read();
        Snapshot {
            view: Arc::clone(&state.view),
            cache: Arc::clone(&state.cache),
        }
    }

    /// Run the pipeline.
    ///
    /// Does nothing unless `initial` is set or applications were marked
    /// changed. The first initial run opens the [`ReadyGate`], whatever its
    /// outcome.
    pub fn run(&self, initial: bool) -> RunOutcome {
        let _enter = self.span.enter();
        let _serial = self.run_lock.lock();

        let outcome = self.run_pipeline(initial);

        if initial && self.ready.signal() {
            info!("initial sidecar sync done");
        }
        outcome
    }

    fn run_pipeline(&self, initial: bool) -> RunOutcome {
        let changed = std::mem::take(&mut self.state.write().dirty);

        if !initial && changed.is_empty() {
            debug!("no changed apps, skipping sidecar refresh");
            self.metrics.record_idle();
            return RunOutcome::Idle;
        }

        info!(initial, changed = ?changed, "refreshing sidecars");

        let (sources, previous_view, previous_timestamps, previous_cache) = {
            let state = self.state.read();
            (
                state.sources.clone(),
                Arc::clone(&state.view),
                Arc::clone(&state.timestamps),
                Arc::clone(&state.cache),
            )
        };

        let merged = aggregate(sources.values().map(Arc::as_ref));

        let mut diff = Diff::between(&previous_view, &merged);
        if diff.is_empty() {
            debug!(
                changed = changed.len(),
                size = merged.len(),
                "apps changed, but merged call models did not"
            );
            self.metrics.record_unchanged();
            return RunOutcome::Unchanged;
        }
        info!(diff = %render(&diff), "call model diff");

        let mut timestamps = (*previous_timestamps).clone();
        let suppression = self
            .suppressor
            .suppress(&mut diff, &mut timestamps, self.clock.now());

        if suppression.changed() {
            self.metrics.record_withheld(
                suppression.apps_withheld + suppression.removals_withheld,
            );
        }
        if diff.is_empty() {
            info!(
                changed = changed.len(),
                size = merged.len(),
                "apps changed, but every change is cooling down"
            );
            self.metrics.record_suppressed();
            return RunOutcome::Suppressed;
        } else if suppression.changed() {
            info!(diff = %render(&diff), "filtered call model diff");
        }

        let synthesis = self
            .synthesizer
            .synthesize(&merged, &diff, self.clock.wall_time());
        let Reconciliation {
            cache,
            events,
            added,
            updated,
            deleted,
        } = reconcile(synthesis, &previous_cache);

        let (prev_size, size) = (previous_view.len(), merged.len());
        // Withheld removals stay in the committed view so a later run can
        // still find them.
        let committed = if suppression.changed() {
            committed_view(&previous_view, &diff, &merged)
        } else {
            merged
        };
        {
            let mut state = self.state.write();
            state.view = Arc::new(committed);
            state.timestamps = Arc::new(timestamps);
            state.cache = Arc::new(cache);
        }

        if events.is_empty() {
            warn!(
                changed = changed.len(),
                prev_size, size, "merged call models changed, but no sidecars changed"
            );
            self.metrics.record_without_events();
            return RunOutcome::NoConfigChange;
        }

        info!(
            changed = changed.len(),
            prev_size,
            size,
            events = events.len(),
            added,
            updated,
            deleted,
            "sidecars changed"
        );
        self.metrics.record_emitted(added, updated, deleted);
        self.dispatch(&events);

        RunOutcome::Emitted {
            added,
            updated,
            deleted,
        }
    }

    /// Deliver `events` to every handler, in order.
    ///
    /// Every handler sees every event; a handler's failure is its own.
    pub fn dispatch(&self, events: &[ConfigEvent]) {
        for event in events {
            for handler in &self.handlers {
                handler.handle(event);
            }
        }
    }

    /// The gate opened by the first initial run.
    pub fn ready(&self) -> &ReadyGate {
        &self.ready
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// The cool-down suppressor in use.
    pub fn suppressor(&self) -> &Suppressor {
        &self.suppressor
    }

    /// How often a [`RefreshDriver`](crate::RefreshDriver) should poll this
    /// coordinator.
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// The config synthesizer in use.
    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synthesizer
    }
}

/// `previous` advanced by the filtered `diff` only, with `provides` taken
/// from `merged` since it never takes part in a diff.
fn committed_view(previous: &GlobalView, diff: &Diff, merged: &GlobalView) -> GlobalView {
    let mut view = diff.apply_to(previous);
    for (app, model) in view.iter_mut() {
        if let Some(current) = merged.get(app) {
            model.provides.clone_from(&current.provides);
        }
    }
    view
}

fn render(diff: &Diff) -> String {
    serde_json::to_string(diff).unwrap_or_else(|e| format!("<unserializable diff: {e}>"))
}
