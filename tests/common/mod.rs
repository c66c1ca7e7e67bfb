//! Shared fixtures for integration tests.

#![allow(dead_code)]

use sidecar_sync::{CallModel, CallModels, ConfigEvent, EventKind};

/// Facts with a single application consuming `services`.
pub fn consumer(application: &str, services: &[&str]) -> CallModels {
    models(&[CallModel::new(application).with_consumes(services.iter().copied())])
}

pub fn models(models: &[CallModel]) -> CallModels {
    models
        .iter()
        .map(|m| (m.application.clone(), m.clone()))
        .collect()
}

/// `(kind, identity)` pairs for compact assertions.
pub fn summary(events: &[ConfigEvent]) -> Vec<(EventKind, String)> {
    events
        .iter()
        .map(|e| (e.kind, e.full_name().to_string()))
        .collect()
}
