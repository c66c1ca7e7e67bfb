//! Construction of a wired-up [`Coordinator`].

use crate::application::config::{ConfigError, SyncConfig};
use crate::application::coordinator::Coordinator;
use crate::application::ports::{Clock, EventHandler};
use crate::infrastructure::clock::SystemClock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::Span;

/// Error returned when building a [`Coordinator`] fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// Configuration validation failed
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Builder for constructing a [`Coordinator`].
///
/// # Example
/// ```
/// use sidecar_sync::{Coordinator, FnHandler};
/// use std::time::Duration;
///
/// let coordinator = Coordinator::builder()
///     .with_suppression_window(Duration::from_secs(10))
///     .with_namespace("mesh-system")
///     .with_handler(FnHandler(|event: &sidecar_sync::ConfigEvent| {
///         println!("{} {}", event.kind, event.full_name());
///     }))
///     .build()
///     .unwrap();
///
/// assert_eq!(coordinator.synthesizer().namespace(), "mesh-system");
/// ```
pub struct CoordinatorBuilder {
    config: SyncConfig,
    clock: Option<Arc<dyn Clock>>,
    handlers: Vec<Arc<dyn EventHandler>>,
    span: Option<Span>,
}

impl std::fmt::Debug for CoordinatorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorBuilder")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CoordinatorBuilder {
    /// Start from [`SyncConfig::default`], the system clock and no handlers.
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
            clock: None,
            handlers: Vec::new(),
            span: None,
        }
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the cool-down window for dependency removals.
    ///
    /// Zero disables suppression.
    pub fn with_suppression_window(mut self, window: Duration) -> Self {
        self.config.suppression_window = window;
        self
    }

    /// Set the label key used in workload selectors.
    pub fn with_workload_app_label(mut self, label: impl Into<String>) -> Self {
        self.config.workload_app_label = label.into();
        self
    }

    /// Set the namespace generated configs live in.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Stamp generated configs with a control-plane revision label.
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.config.revision = Some(revision.into());
        self
    }

    /// Set how often a refresh driver polls the coordinator.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.config.refresh_interval = interval;
        self
    }

    /// Set a custom clock (useful for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Add an event handler. Handlers see events in registration order.
    pub fn with_handler<H: EventHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Add an event handler that is already shared.
    pub fn with_shared_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set the span pipeline logs are recorded under.
    ///
    /// Defaults to an `info`-level span named `sidecar_sync` carrying the
    /// namespace.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Build the coordinator.
    ///
    /// # Errors
    /// Returns `BuildError` if the configuration is invalid.
    pub fn build(self) -> Result<Coordinator, BuildError> {
        self.config.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        let span = self.span.unwrap_or_else(|| {
            tracing::info_span!("sidecar_sync", namespace = %self.config.namespace)
        });

        Ok(Coordinator::new(&self.config, clock, self.handlers, span))
    }
}

impl Coordinator {
    /// Create a builder for configuring a coordinator.
    ///
    /// Defaults:
    /// - Suppression window: 30 seconds
    /// - Workload label: `app`
    /// - Namespace: `dubbo-system`
    /// - Refresh interval: 1 second
    /// - Clock: system clock
    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }
}
