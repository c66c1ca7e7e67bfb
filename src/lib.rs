//! # sidecar-sync
//!
//! Incremental synchronization of service-dependency call models into
//! per-application sidecar configuration events.
//!
//! Service-registry watchers report, per source, which applications provide
//! and consume which services. This crate merges those facts into one view,
//! diffs it against the last committed view, withholds dependency removals
//! that arrive too soon after a previous change, derives one sidecar config
//! per consuming application, and tells downstream handlers what was added,
//! updated or deleted.
//!
//! ## Quick Start
//!
//! ```rust
//! use sidecar_sync::{CallModel, CallModels, Coordinator, LoggingHandler, RunOutcome};
//! use std::time::Duration;
//!
//! let coordinator = Coordinator::builder()
//!     .with_suppression_window(Duration::from_secs(30))
//!     .with_handler(LoggingHandler::new())
//!     .build()
//!     .unwrap();
//!
//! // Facts observed for service `svcA`: app1 consumes it.
//! let facts: CallModels = [(
//!     "app1".to_string(),
//!     CallModel::new("app1").with_consumes(["svcA"]),
//! )]
//! .into_iter()
//! .collect();
//! coordinator.update_source("svcA", facts);
//!
//! let outcome = coordinator.run(true);
//! assert_eq!(outcome, RunOutcome::Emitted { added: 1, updated: 0, deleted: 0 });
//! assert!(coordinator.ready().is_ready());
//! ```
//!
//! ## Pipeline
//!
//! Each [`Coordinator::run`] goes through the same stages:
//!
//! 1. **Merge** every source's facts into a [`GlobalView`] ([`aggregate`])
//! 2. **Diff** against the previously committed view ([`Diff::between`])
//! 3. **Suppress** removals of dependencies that changed within the
//!    cool-down window ([`Suppressor`])
//! 4. **Synthesize** a [`SidecarConfig`] per application in the diff
//!    ([`Synthesizer`])
//! 5. **Reconcile** against what handlers were last told and classify
//!    events ([`reconcile`])
//! 6. **Dispatch** the events to every [`EventHandler`]
//!
//! A run that ends with nothing to report (nothing changed, or every change
//! is still cooling down) commits nothing. The next triggered run diffs
//! against the same committed view, so withheld removals land once a later
//! notification arrives after the window.
//!
//! ## Suppression
//!
//! Registries flap. A consumer that briefly disappears should not have its
//! sidecar shrunk and regrown within seconds. Removing a dependency is
//! therefore withheld while the application is cooling down from its last
//! change. Additions always pass through.
//!
//! ```rust
//! use sidecar_sync::{CallModel, CallModels, Coordinator, RunOutcome};
//! use std::time::Duration;
//!
//! let coordinator = Coordinator::builder()
//!     .with_suppression_window(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//!
//! let facts = |services: &[&str]| -> CallModels {
//!     [(
//!         "app1".to_string(),
//!         CallModel::new("app1").with_consumes(services.iter().copied()),
//!     )]
//!     .into_iter()
//!     .collect()
//! };
//!
//! coordinator.update_source("registry", facts(&["svcA", "svcB"]));
//! coordinator.run(true);
//!
//! // Dropping svcB right away is withheld.
//! coordinator.update_source("registry", facts(&["svcA"]));
//! assert_eq!(coordinator.run(false), RunOutcome::Suppressed);
//! ```
//!
//! ## Running periodically
//!
//! [`RefreshDriver`] performs the initial sync and then polls a shared
//! coordinator on a tokio runtime:
//!
//! ```rust,no_run
//! use sidecar_sync::{Coordinator, RefreshDriver};
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let coordinator = Arc::new(Coordinator::builder().build().unwrap());
//! let handle = RefreshDriver::new(Arc::clone(&coordinator)).start();
//!
//! coordinator.ready().wait().await;
//! // ... feed facts from registry watchers ...
//!
//! handle.shutdown().await.expect("driver stopped");
//! # }
//! ```
//!
//! ## Observability
//!
//! Every run logs through `tracing` under the coordinator's span. Run
//! outcomes and event counts are tracked in [`Metrics`]:
//!
//! ```rust
//! # use sidecar_sync::Coordinator;
//! # let coordinator = Coordinator::builder().build().unwrap();
//! let snapshot = coordinator.metrics().snapshot();
//! println!("runs: {}, events: {}", snapshot.total_runs(), snapshot.total_events());
//! ```
//!
//! [`dump_snapshot`] renders the merged view and emitted configs as YAML for
//! debugging.

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    call_model::{aggregate, CallModel, CallModels, GlobalView, PerSourceView, SourceId},
    diff::{Diff, DiffEntry, DiffKey, ServiceChange},
    event::{ConfigEvent, EventKind},
    facts::{changed_applications, Endpoint, FactExtractor, RegistryEntry},
    sidecar::{FullName, SidecarConfig, Synthesis, Synthesizer},
    suppression::{SuppressionOutcome, Suppressor, UpdateTimestamps},
};

pub use application::{
    config::{ConfigError, SyncConfig},
    coordinator::{Coordinator, RunOutcome, Snapshot},
    driver::{DriverHandle, RefreshDriver, ShutdownError},
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, EventHandler, FnHandler},
    ready::ReadyGate,
    reconciler::{reconcile, EmittedCache, Reconciliation},
};

pub use infrastructure::{
    builder::{BuildError, CoordinatorBuilder},
    clock::SystemClock,
    dump::{dump_call_models, dump_emitted, dump_snapshot, dump_snapshot_json, DumpError},
    handler::LoggingHandler,
};
