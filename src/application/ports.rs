//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::event::ConfigEvent;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant. Drives the suppression window.
    fn now(&self) -> Instant;

    /// Wall-clock time used to stamp config metadata.
    fn wall_time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Port for consumers of config change events.
///
/// Handlers are called synchronously, once per event, in the order the
/// events were produced. Failures are the handler's own business; the
/// coordinator neither catches nor retries them.
pub trait EventHandler: Send + Sync {
    /// Handle one event.
    fn handle(&self, event: &ConfigEvent);
}

impl<H: EventHandler + ?Sized> EventHandler for Arc<H> {
    fn handle(&self, event: &ConfigEvent) {
        (**self).handle(event)
    }
}

/// Adapter turning a closure into an [`EventHandler`].
pub struct FnHandler<F>(pub F);

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&ConfigEvent) + Send + Sync,
{
    fn handle(&self, event: &ConfigEvent) {
        (self.0)(event)
    }
}
