//! Reconciliation of synthesized configs against the emitted cache.
//!
//! The emitted cache is what downstream handlers currently believe. The
//! reconciler overlays a synthesis onto it and reports the difference as
//! Added/Updated/Deleted events.

use crate::domain::event::{ConfigEvent, EventKind};
use crate::domain::sidecar::{FullName, SidecarConfig, Synthesis};
use std::collections::BTreeMap;

/// Last emitted config per identity.
pub type EmittedCache = BTreeMap<FullName, SidecarConfig>;

/// Result of reconciling a synthesis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// The cache after this round
    pub cache: EmittedCache,
    /// Events, additions and updates first, then deletions
    pub events: Vec<ConfigEvent>,
    /// Number of Added events
    pub added: usize,
    /// Number of Updated events
    pub updated: usize,
    /// Number of Deleted events
    pub deleted: usize,
}

/// Overlay `synthesis` onto `previous` and compute the events.
///
/// Configs equivalent to their cached counterpart (ignoring creation time
/// and version) produce no event, and the cached entry is kept as is.
pub fn reconcile(synthesis: Synthesis, previous: &EmittedCache) -> Reconciliation {
    let Synthesis { configs, deletions } = synthesis;

    let mut cache: EmittedCache = previous
        .iter()
        .filter(|(name, _)| !deletions.contains(*name))
        .map(|(name, cfg)| (name.clone(), cfg.clone()))
        .collect();

    let mut out = Reconciliation::default();

    for cfg in configs {
        let name = cfg.full_name().clone();
        match previous.get(&name) {
            None => {
                out.events.push(ConfigEvent::new(EventKind::Added, cfg.clone()));
                out.added += 1;
                cache.insert(name, cfg);
            }
            Some(prev) if !prev.equivalent(&cfg) => {
                out.events
                    .push(ConfigEvent::new(EventKind::Updated, cfg.clone()));
                out.updated += 1;
                cache.insert(name, cfg);
            }
            Some(prev) => {
                cache.insert(name, prev.clone());
            }
        }
    }

    // Nothing can have disappeared if nothing was added and the size held.
    if !(out.added == 0 && previous.len() == cache.len()) {
        for (name, prev) in previous {
            if !cache.contains_key(name) {
                out.events
                    .push(ConfigEvent::new(EventKind::Deleted, prev.clone()));
                out.deleted += 1;
            }
        }
    }

    out.cache = cache;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call_model::{CallModel, GlobalView};
    use crate::domain::diff::Diff;
    use crate::domain::sidecar::Synthesizer;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn view(models: &[CallModel]) -> GlobalView {
        models
            .iter()
            .map(|m| (m.application.clone(), m.clone()))
            .collect()
    }

    fn synth(prev: &GlobalView, cur: &GlobalView) -> Synthesis {
        Synthesizer::new("ns", "app", None).synthesize(cur, &Diff::between(prev, cur), Utc::now())
    }

    #[test]
    fn test_reconcile_added() {
        let cur = view(&[CallModel::new("app1").with_consumes(["svcA"])]);
        let out = reconcile(synth(&GlobalView::new(), &cur), &EmittedCache::new());

        assert_eq!(out.added, 1);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].kind, EventKind::Added);
        assert_eq!(out.cache.len(), 1);
    }

    #[test]
    fn test_reconcile_updated_and_unchanged() {
        let v1 = view(&[CallModel::new("app1").with_consumes(["svcA"])]);
        let first = reconcile(synth(&GlobalView::new(), &v1), &EmittedCache::new());

        let v2 = view(&[CallModel::new("app1").with_consumes(["svcA", "svcB"])]);
        let second = reconcile(synth(&v1, &v2), &first.cache);
        assert_eq!(second.updated, 1);
        assert_eq!(second.events[0].kind, EventKind::Updated);
        assert_eq!(second.events[0].config.egress_hosts(), ["*/svcA", "*/svcB"]);

        // Rebuilding an identical config reports nothing and keeps the cached stamp.
        let again = reconcile(synth(&GlobalView::new(), &v2), &second.cache);
        assert!(again.events.is_empty());
        assert_eq!(again.cache, second.cache);
    }

    #[test]
    fn test_reconcile_deleted() {
        let v1 = view(&[
            CallModel::new("app1").with_consumes(["svcA"]),
            CallModel::new("app2").with_consumes(["svcB"]),
        ]);
        let first = reconcile(synth(&GlobalView::new(), &v1), &EmittedCache::new());

        let v2 = view(&[CallModel::new("app2").with_consumes(["svcB"])]);
        let second = reconcile(synth(&v1, &v2), &first.cache);

        assert_eq!(second.deleted, 1);
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].kind, EventKind::Deleted);
        assert_eq!(second.events[0].full_name().name, "app1.dubbo.generated");
        assert_eq!(second.cache.len(), 1);
    }

    #[test]
    fn test_reconcile_orders_deletions_last() {
        let v1 = view(&[CallModel::new("a").with_consumes(["svcA"])]);
        let first = reconcile(synth(&GlobalView::new(), &v1), &EmittedCache::new());

        let v2 = view(&[CallModel::new("z").with_consumes(["svcZ"])]);
        let second = reconcile(synth(&v1, &v2), &first.cache);

        let kinds: Vec<_> = second.events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::Added, EventKind::Deleted]);
    }

    #[test]
    fn test_reconcile_deletion_of_unknown_identity() {
        let synthesis = Synthesis {
            configs: Vec::new(),
            deletions: BTreeSet::from([FullName::new("ns", "ghost")]),
        };
        let out = reconcile(synthesis, &EmittedCache::new());
        assert!(out.events.is_empty());
        assert!(out.cache.is_empty());
    }
}
