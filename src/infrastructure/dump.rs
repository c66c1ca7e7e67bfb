//! Diagnostic serialization of pipeline state.
//!
//! Renders the merged call models (and optionally the emitted cache) as
//! YAML for operators.

use crate::application::coordinator::{Coordinator, Snapshot};
use crate::application::reconciler::EmittedCache;
use crate::domain::call_model::GlobalView;
use crate::domain::sidecar::SidecarConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error returned when state cannot be serialized.
#[derive(Debug, Error)]
pub enum DumpError {
    /// YAML serialization failed
    #[error("unable to marshal call models: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON serialization failed
    #[error("unable to marshal snapshot as json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Render the merged call models as YAML.
///
/// # Errors
/// Returns [`DumpError`] if serialization fails; pipeline state is not
/// affected.
pub fn dump_call_models(view: &GlobalView) -> Result<String, DumpError> {
    Ok(serde_yaml::to_string(view)?)
}

/// Render the emitted cache as YAML, keyed by `namespace/name`.
///
/// # Errors
/// Returns [`DumpError`] if serialization fails.
pub fn dump_emitted(cache: &EmittedCache) -> Result<String, DumpError> {
    let keyed: BTreeMap<String, &SidecarConfig> = cache
        .iter()
        .map(|(name, cfg)| (name.to_string(), cfg))
        .collect();
    Ok(serde_yaml::to_string(&keyed)?)
}

/// Render a whole snapshot: call models first, then emitted configs.
///
/// # Errors
/// Returns [`DumpError`] if serialization fails.
pub fn dump_snapshot(snapshot: &Snapshot) -> Result<String, DumpError> {
    let call_models = dump_call_models(&snapshot.view)?;
    let sidecars = dump_emitted(&snapshot.cache)?;
    Ok(format!(
        "# call models\n{call_models}---\n# sidecars\n{sidecars}"
    ))
}

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    call_models: &'a GlobalView,
    sidecars: BTreeMap<String, &'a SidecarConfig>,
}

/// Render a whole snapshot as one pretty-printed JSON document with
/// `call_models` and `sidecars` keys.
///
/// # Errors
/// Returns [`DumpError`] if serialization fails.
pub fn dump_snapshot_json(snapshot: &Snapshot) -> Result<String, DumpError> {
    let document = SnapshotDocument {
        call_models: &snapshot.view,
        sidecars: snapshot
            .cache
            .iter()
            .map(|(name, cfg)| (name.to_string(), cfg))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

impl Coordinator {
    /// Render the currently committed call models as YAML.
    ///
    /// # Errors
    /// Returns [`DumpError`] if serialization fails.
    pub fn dump_call_models(&self) -> Result<String, DumpError> {
        dump_call_models(&self.snapshot().view)
    }
}
