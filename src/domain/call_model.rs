//! Call models and their aggregation into a global view.
//!
//! A call model records which services an application provides and which it
//! consumes. Facts arrive per registry source; the aggregator folds every
//! source's contribution into a single [`GlobalView`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identity of the registry entry that produced a set of facts.
pub type SourceId = String;

/// Call models keyed by application name.
pub type CallModels = BTreeMap<String, CallModel>;

/// The merged view of every source: application name to call model.
pub type GlobalView = CallModels;

/// Per-source facts. A source's absence removes its contribution on the
/// next merge.
pub type PerSourceView = BTreeMap<SourceId, CallModels>;

/// The provide/consume service sets of one application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallModel {
    /// Application name
    pub application: String,
    /// Services this application provides
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub provides: BTreeSet<String>,
    /// Services this application depends on
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub consumes: BTreeSet<String>,
}

impl CallModel {
    /// Create an empty call model for an application.
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            provides: BTreeSet::new(),
            consumes: BTreeSet::new(),
        }
    }

    /// Add provided services.
    pub fn with_provides<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(services.into_iter().map(Into::into));
        self
    }

    /// Add consumed services.
    pub fn with_consumes<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes.extend(services.into_iter().map(Into::into));
        self
    }

    /// Whether the application provides `service`.
    pub fn provides(&self, service: &str) -> bool {
        self.provides.contains(service)
    }

    /// Whether the application consumes `service`.
    pub fn consumes(&self, service: &str) -> bool {
        self.consumes.contains(service)
    }

    /// Fold `other` into this model.
    ///
    /// Consumed services always accumulate. The application name and the
    /// provided services are only taken from `other` when this model has
    /// none yet (first writer wins).
    pub fn absorb(&mut self, other: &CallModel) {
        if self.application.is_empty() {
            self.application = other.application.clone();
        }
        if self.provides.is_empty() {
            self.provides = other.provides.clone();
        }
        self.consumes.extend(other.consumes.iter().cloned());
    }
}

// A missing set deserializes to an empty one, so plain set equality
// already treats absent and empty alike.
impl PartialEq for CallModel {
    fn eq(&self, other: &Self) -> bool {
        self.application == other.application
            && self.provides == other.provides
            && self.consumes == other.consumes
    }
}

impl Eq for CallModel {}

impl fmt::Display for CallModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.application)
    }
}

/// Merge every source's call models into a fresh global view.
///
/// The result is rebuilt from scratch on every call; nothing from a previous
/// view leaks in. Merging the same input twice yields identical views.
pub fn aggregate<'a, I>(sources: I) -> GlobalView
where
    I: IntoIterator<Item = &'a CallModels>,
{
    let mut merged = GlobalView::new();

    for models in sources {
        for (app, model) in models {
            merged
                .entry(app.clone())
                .or_insert_with(|| CallModel::new(app.clone()))
                .absorb(model);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn models(entries: &[CallModel]) -> CallModels {
        entries
            .iter()
            .map(|m| (m.application.clone(), m.clone()))
            .collect()
    }

    #[test]
    fn test_equality_ignores_set_construction() {
        let a = CallModel::new("app1");
        let b = CallModel {
            application: "app1".to_string(),
            provides: BTreeSet::new(),
            consumes: BTreeSet::new(),
        };
        assert_eq!(a, b);

        let c = CallModel::new("app1").with_consumes(["svcA"]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_absent_sets_deserialize_as_empty() {
        let model: CallModel = serde_json::from_str(r#"{"application":"app1"}"#).unwrap();
        assert_eq!(model, CallModel::new("app1"));
    }

    #[test]
    fn test_aggregate_empty() {
        let sources = PerSourceView::new();
        assert!(aggregate(sources.values()).is_empty());
    }

    #[test]
    fn test_aggregate_unions_consumes() {
        let mut sources = PerSourceView::new();
        sources.insert(
            "svcA".to_string(),
            models(&[CallModel::new("app1").with_consumes(["svcA"])]),
        );
        sources.insert(
            "svcB".to_string(),
            models(&[
                CallModel::new("app1").with_consumes(["svcB"]),
                CallModel::new("app2").with_provides(["svcB"]),
            ]),
        );

        let view = aggregate(sources.values());

        assert_eq!(view.len(), 2);
        let app1 = &view["app1"];
        assert!(app1.consumes("svcA"));
        assert!(app1.consumes("svcB"));
        assert_eq!(view["app2"].application, "app2");
        assert!(view["app2"].provides("svcB"));
    }

    #[test]
    fn test_aggregate_provides_first_writer_wins() {
        let mut sources = PerSourceView::new();
        sources.insert(
            "a".to_string(),
            models(&[CallModel::new("app1").with_provides(["svcA"])]),
        );
        sources.insert(
            "b".to_string(),
            models(&[CallModel::new("app1").with_provides(["svcB"])]),
        );

        let view = aggregate(sources.values());
        assert!(view["app1"].provides("svcA"));
        assert!(!view["app1"].provides("svcB"));
    }

    fn arb_sources() -> impl Strategy<Value = PerSourceView> {
        let model = (
            "[a-d]",
            prop::collection::btree_set("[s-v]", 0..4),
            prop::collection::btree_set("[s-v]", 0..4),
        )
            .prop_map(|(app, provides, consumes)| CallModel {
                application: app,
                provides,
                consumes,
            });
        let per_source = prop::collection::vec(model, 0..4).prop_map(|ms| models(&ms));
        prop::collection::btree_map("[0-3]", per_source, 0..4)
    }

    proptest! {
        #[test]
        fn prop_aggregate_is_idempotent(sources in arb_sources()) {
            let first = aggregate(sources.values());
            let second = aggregate(sources.values());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_aggregate_consumes_is_union(sources in arb_sources()) {
            let view = aggregate(sources.values());
            for models in sources.values() {
                for (app, model) in models {
                    prop_assert!(model.consumes.is_subset(&view[app].consumes));
                }
            }
        }
    }
}
