//! Event handler that reports config changes through `tracing`.

use crate::application::ports::EventHandler;
use crate::domain::event::{ConfigEvent, EventKind};
use tracing::{info, warn};

/// Logs each event at `info`, deletions at `warn`.
///
/// Useful as a stand-in downstream while wiring a pipeline up, or next to a
/// real handler for an audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHandler {
    hosts: bool,
}

impl LoggingHandler {
    /// Create a handler that logs identities only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log the egress hosts of added and updated configs.
    pub fn with_hosts(mut self) -> Self {
        self.hosts = true;
        self
    }
}

impl EventHandler for LoggingHandler {
    fn handle(&self, event: &ConfigEvent) {
        let name = event.full_name();
        match event.kind {
            EventKind::Deleted => warn!(target: "sidecar_sync::events", %name, "sidecar deleted"),
            kind if self.hosts => info!(
                target: "sidecar_sync::events",
                %kind,
                %name,
                version = %event.config.meta.version,
                hosts = ?event.config.egress_hosts(),
                "sidecar changed"
            ),
            kind => info!(
                target: "sidecar_sync::events",
                %kind,
                %name,
                version = %event.config.meta.version,
                "sidecar changed"
            ),
        }
    }
}
