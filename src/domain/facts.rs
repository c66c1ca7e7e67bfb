//! Fact computation from registry entries.
//!
//! A registry entry describes one service interface together with the
//! endpoints that provide it. Inbound endpoints are the consumers calling
//! that interface. Each endpoint names its application through a label.

use crate::domain::call_model::{CallModel, CallModels};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default label carrying an endpoint's application name.
pub const DEFAULT_APP_LABEL: &str = "application";

/// Default hostname suffix trimmed from registry hosts.
pub const DEFAULT_HOSTNAME_SUFFIX: &str = ".dubbo";

/// A workload endpoint with its labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Endpoint address
    #[serde(default)]
    pub address: String,
    /// Endpoint labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Endpoint {
    /// Create an endpoint labeled with `label = application`.
    pub fn labeled(address: impl Into<String>, label: &str, application: &str) -> Self {
        Self {
            address: address.into(),
            labels: BTreeMap::from([(label.to_string(), application.to_string())]),
        }
    }
}

/// A registry entry: one service interface and its providers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Hostnames; the first one names the interface
    pub hosts: Vec<String>,
    /// Provider endpoints
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Turns registry entries into per-application call models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactExtractor {
    app_label: String,
    hostname_suffix: String,
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_APP_LABEL, DEFAULT_HOSTNAME_SUFFIX)
    }
}

impl FactExtractor {
    /// Create an extractor reading `app_label` and trimming `hostname_suffix`.
    pub fn new(app_label: impl Into<String>, hostname_suffix: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            hostname_suffix: hostname_suffix.into(),
        }
    }

    /// Compute call models for one entry.
    ///
    /// Providers populate `provides`, inbound endpoints populate `consumes`.
    /// Endpoints without the application label are skipped. An entry without
    /// hosts yields no facts.
    pub fn compute_facts(&self, entry: &RegistryEntry, inbound: &[Endpoint]) -> CallModels {
        let mut models = CallModels::new();

        let Some(host) = entry.hosts.first() else {
            return models;
        };
        let interface = host
            .strip_suffix(self.hostname_suffix.as_str())
            .unwrap_or(host);

        let sides = [(entry.endpoints.as_slice(), false), (inbound, true)];
        for (endpoints, consumer) in sides {
            for endpoint in endpoints {
                let Some(app) = endpoint.labels.get(&self.app_label) else {
                    continue;
                };

                let model = models
                    .entry(app.clone())
                    .or_insert_with(|| CallModel::new(app.clone()));
                let set = if consumer {
                    &mut model.consumes
                } else {
                    &mut model.provides
                };
                set.insert(interface.to_string());
            }
        }

        models
    }
}

/// Applications whose call model differs between `prev` and `cur`,
/// including ones that appear or disappear.
pub fn changed_applications(prev: &CallModels, cur: &CallModels) -> Vec<String> {
    let mut changed: Vec<String> = prev
        .iter()
        .filter(|(app, model)| cur.get(*app) != Some(*model))
        .map(|(app, _)| app.clone())
        .collect();

    changed.extend(
        cur.keys()
            .filter(|app| !prev.contains_key(*app))
            .cloned(),
    );

    changed
}
