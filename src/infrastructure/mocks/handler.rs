//! Recording event handler for testing.

use crate::application::ports::EventHandler;
use crate::domain::event::{ConfigEvent, EventKind};
use parking_lot::Mutex;
use std::sync::Arc;

/// Handler that records every event it receives.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    captured: Arc<Mutex<Vec<ConfigEvent>>>,
}

impl RecordingHandler {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far, in delivery order.
    pub fn events(&self) -> Vec<ConfigEvent> {
        self.captured.lock().clone()
    }

    /// Kinds of the events received so far.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.captured.lock().iter().map(|e| e.kind).collect()
    }

    /// Number of events received.
    pub fn count(&self) -> usize {
        self.captured.lock().len()
    }

    /// Take all recorded events, leaving the recorder empty.
    pub fn drain(&self) -> Vec<ConfigEvent> {
        std::mem::take(&mut *self.captured.lock())
    }

    /// Forget all recorded events.
    pub fn clear(&self) {
        self.captured.lock().clear();
    }
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: &ConfigEvent) {
        self.captured.lock().push(event.clone());
    }
}
