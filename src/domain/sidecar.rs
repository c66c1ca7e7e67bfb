//! Derived sidecar configuration and its synthesis from call models.
//!
//! Every application with at least one consumed service gets a sidecar
//! config whose egress hosts list exactly those services. Synthesis is
//! scoped by a [`Diff`]: only applications named in the diff are rebuilt.

use crate::domain::call_model::{CallModel, GlobalView};
use crate::domain::diff::{Diff, DiffKey};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Annotation telling the mesh that the sidecar is not namespace-scoped.
pub const NON_NS_SPEC_ANNOTATION: &str = "sidecar.config.istio.io/nonNsSpec";

/// Label carrying the control-plane revision.
pub const REVISION_LABEL: &str = "istio.io/rev";

/// Protocol of the generated egress listener port.
pub const EGRESS_PROTOCOL: &str = "DUBBO";

/// Namespace wildcard prefixed to every egress host.
pub const WILDCARD_NAMESPACE: &str = "*";

/// Suffix appended to an application name to form the config name.
pub const GENERATED_NAME_SUFFIX: &str = ".dubbo.generated";

/// Namespaced identity of a derived config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FullName {
    /// Namespace
    pub namespace: String,
    /// Local name
    pub name: String,
}

impl FullName {
    /// Create a full name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of the config generated for `application` in `namespace`.
    pub fn for_application(namespace: &str, application: &str) -> Self {
        Self::new(namespace, format!("{application}{GENERATED_NAME_SUFFIX}"))
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Resource metadata stamped on a derived config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigMeta {
    /// Identity
    pub full_name: FullName,
    /// When the config was synthesized
    pub create_time: DateTime<Utc>,
    /// Version string, derived from the creation time
    pub version: String,
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Annotations
    pub annotations: BTreeMap<String, String>,
}

/// Selects the workloads a sidecar applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadSelector {
    /// Labels a workload must carry
    pub labels: BTreeMap<String, String>,
}

/// An egress listener restricting reachable hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EgressListener {
    /// Reachable hosts, sorted, in `namespace/host` form
    pub hosts: Vec<String>,
    /// Port protocol
    pub protocol: String,
}

/// Sidecar body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sidecar {
    /// Workload selection
    pub workload_selector: WorkloadSelector,
    /// Egress listeners
    pub egress: Vec<EgressListener>,
}

/// A sidecar together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidecarConfig {
    /// Metadata
    pub meta: ConfigMeta,
    /// Body
    pub sidecar: Sidecar,
}

impl SidecarConfig {
    /// Identity of this config.
    pub fn full_name(&self) -> &FullName {
        &self.meta.full_name
    }

    /// Egress hosts of the first listener.
    pub fn egress_hosts(&self) -> &[String] {
        self.sidecar
            .egress
            .first()
            .map(|l| l.hosts.as_slice())
            .unwrap_or_default()
    }

    /// Whether two configs would configure the data plane identically.
    ///
    /// Creation time and version are ignored.
    pub fn equivalent(&self, other: &SidecarConfig) -> bool {
        self.meta.full_name == other.meta.full_name
            && self.meta.labels == other.meta.labels
            && self.meta.annotations == other.meta.annotations
            && self.sidecar == other.sidecar
    }
}

/// Output of a synthesis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synthesis {
    /// Rebuilt configs, in application order
    pub configs: Vec<SidecarConfig>,
    /// Identities to delete
    pub deletions: BTreeSet<FullName>,
}

/// Builds sidecar configs from merged call models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesizer {
    namespace: String,
    workload_app_label: String,
    revision: Option<String>,
}

impl Synthesizer {
    /// Create a synthesizer.
    ///
    /// # Arguments
    /// * `namespace` - Namespace of generated identities
    /// * `workload_app_label` - Label key used to select an application's workloads
    /// * `revision` - Optional control-plane revision label value
    pub fn new(
        namespace: impl Into<String>,
        workload_app_label: impl Into<String>,
        revision: Option<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            workload_app_label: workload_app_label.into(),
            revision,
        }
    }

    /// Namespace of generated identities.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Label key of the workload selector.
    pub fn workload_app_label(&self) -> &str {
        &self.workload_app_label
    }

    /// Revision label value, if any.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    /// Identity of the config generated for `application`.
    pub fn identity(&self, application: &str) -> FullName {
        FullName::for_application(&self.namespace, application)
    }

    /// Rebuild configs for every application named in `diff`.
    ///
    /// Deleted applications land in `deletions`. For everything else the
    /// application's full current entry in `view` is published, not the diff
    /// fragment. An application without consumed services gets no config and
    /// is scheduled for deletion instead.
    pub fn synthesize(&self, view: &GlobalView, diff: &Diff, now: DateTime<Utc>) -> Synthesis {
        let mut out = Synthesis::default();

        for (key, _) in diff.iter() {
            let app = key.application();
            let identity = self.identity(app);

            if let DiffKey::Deleted(_) = key {
                out.deletions.insert(identity);
                continue;
            }

            match view.get(app) {
                Some(model) if !model.consumes.is_empty() => {
                    out.configs.push(self.build(identity, model, now));
                }
                _ => {
                    out.deletions.insert(identity);
                }
            }
        }

        out
    }

    fn build(&self, full_name: FullName, model: &CallModel, now: DateTime<Utc>) -> SidecarConfig {
        // BTreeSet iteration is already sorted
        let hosts: Vec<String> = model
            .consumes
            .iter()
            .map(|svc| format!("{WILDCARD_NAMESPACE}/{svc}"))
            .collect();

        let mut labels = BTreeMap::new();
        if let Some(rev) = &self.revision {
            labels.insert(REVISION_LABEL.to_string(), rev.clone());
        }

        let annotations =
            BTreeMap::from([(NON_NS_SPEC_ANNOTATION.to_string(), "true".to_string())]);

        SidecarConfig {
            meta: ConfigMeta {
                full_name,
                create_time: now,
                version: now.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
                labels,
                annotations,
            },
            sidecar: Sidecar {
                workload_selector: WorkloadSelector {
                    labels: BTreeMap::from([(
                        self.workload_app_label.clone(),
                        model.application.clone(),
                    )]),
                },
                egress: vec![EgressListener {
                    hosts,
                    protocol: EGRESS_PROTOCOL.to_string(),
                }],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn view(models: &[CallModel]) -> GlobalView {
        models
            .iter()
            .map(|m| (m.application.clone(), m.clone()))
            .collect()
    }

    fn synthesizer() -> Synthesizer {
        Synthesizer::new("dubbo-system", "app", None)
    }

    #[test]
    fn test_identity_is_deterministic() {
        let s = synthesizer();
        assert_eq!(s.identity("app1"), s.identity("app1"));
        assert_eq!(s.identity("app1").to_string(), "dubbo-system/app1.dubbo.generated");
    }

    #[test]
    fn test_synthesize_first_sync() {
        let cur = view(&[CallModel::new("app1").with_consumes(["svcB", "svcA"])]);
        let diff = Diff::between(&GlobalView::new(), &cur);

        let out = synthesizer().synthesize(&cur, &diff, Utc::now());

        assert!(out.deletions.is_empty());
        assert_eq!(out.configs.len(), 1);
        let cfg = &out.configs[0];
        assert_eq!(cfg.egress_hosts(), ["*/svcA", "*/svcB"]);
        assert_eq!(cfg.sidecar.egress[0].protocol, "DUBBO");
        assert_eq!(cfg.sidecar.workload_selector.labels["app"], "app1");
        assert_eq!(cfg.meta.annotations[NON_NS_SPEC_ANNOTATION], "true");
        assert!(cfg.meta.labels.is_empty());
    }

    #[test]
    fn test_synthesize_uses_full_current_entry() {
        let prev = view(&[CallModel::new("app1").with_consumes(["svcA"])]);
        let cur = view(&[CallModel::new("app1").with_consumes(["svcA", "svcB"])]);
        let diff = Diff::between(&prev, &cur);

        let out = synthesizer().synthesize(&cur, &diff, Utc::now());

        assert_eq!(out.configs[0].egress_hosts(), ["*/svcA", "*/svcB"]);
    }

    #[test]
    fn test_synthesize_only_touches_diffed_apps() {
        let prev = view(&[
            CallModel::new("stable").with_consumes(["svcA"]),
            CallModel::new("gone").with_consumes(["svcA"]),
        ]);
        let cur = view(&[
            CallModel::new("stable").with_consumes(["svcA"]),
            CallModel::new("fresh").with_consumes(["svcC"]),
        ]);
        let diff = Diff::between(&prev, &cur);

        let s = synthesizer();
        let out = s.synthesize(&cur, &diff, Utc::now());

        let names: Vec<_> = out.configs.iter().map(|c| c.full_name().clone()).collect();
        assert_eq!(names, vec![s.identity("fresh")]);
        assert_eq!(out.deletions, BTreeSet::from([s.identity("gone")]));
    }

    #[test]
    fn test_synthesize_without_consumes_deletes() {
        let prev = view(&[CallModel::new("app1").with_consumes(["svcA"])]);
        let cur = view(&[CallModel::new("app1").with_provides(["svcP"])]);
        let diff = Diff::between(&prev, &cur);

        let s = synthesizer();
        let out = s.synthesize(&cur, &diff, Utc::now());

        assert!(out.configs.is_empty());
        assert_eq!(out.deletions, BTreeSet::from([s.identity("app1")]));
    }

    #[test]
    fn test_revision_label() {
        let cur = view(&[CallModel::new("app1").with_consumes(["svcA"])]);
        let diff = Diff::between(&GlobalView::new(), &cur);

        let s = Synthesizer::new("ns", "app", Some("canary".to_string()));
        let out = s.synthesize(&cur, &diff, Utc::now());

        assert_eq!(out.configs[0].meta.labels[REVISION_LABEL], "canary");
    }

    #[test]
    fn test_equivalent_ignores_stamp() {
        let cur = view(&[CallModel::new("app1").with_consumes(["svcA"])]);
        let diff = Diff::between(&GlobalView::new(), &cur);
        let s = synthesizer();
        let now = Utc::now();

        let a = s.synthesize(&cur, &diff, now).configs.remove(0);
        let b = s.synthesize(&cur, &diff, now + Duration::seconds(5)).configs.remove(0);

        assert_ne!(a, b);
        assert!(a.equivalent(&b));
    }
}
