//! Change events delivered to downstream handlers.

use crate::domain::sidecar::{FullName, SidecarConfig};
use serde::Serialize;
use std::fmt;

/// Kind of change an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    /// A config appeared
    Added,
    /// An existing config changed
    Updated,
    /// A config went away
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Added => "added",
            EventKind::Updated => "updated",
            EventKind::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// A config change. Deletions carry the last emitted config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigEvent {
    /// What happened
    pub kind: EventKind,
    /// The config it happened to
    pub config: SidecarConfig,
}

impl ConfigEvent {
    /// Create an event.
    pub fn new(kind: EventKind, config: SidecarConfig) -> Self {
        Self { kind, config }
    }

    /// Identity of the affected config.
    pub fn full_name(&self) -> &FullName {
        self.config.full_name()
    }
}
