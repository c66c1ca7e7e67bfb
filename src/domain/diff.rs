//! Differences between two global views.
//!
//! A [`Diff`] holds at most one entry per application. The entry says
//! whether the whole application appeared, disappeared, or only changed
//! some of its consumed services. Only `consumes` participates; a change
//! limited to `provides` yields no entry.

use crate::domain::call_model::{CallModel, GlobalView};
use serde::Serialize;
use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

/// How an application appears in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiffKey<'a> {
    /// Partial update: some consumed services changed
    Bare(&'a str),
    /// The whole application appeared
    Added(&'a str),
    /// The whole application disappeared
    Deleted(&'a str),
}

impl<'a> DiffKey<'a> {
    /// The application name, without the add/delete marker.
    pub fn application(&self) -> &'a str {
        match self {
            DiffKey::Bare(app) | DiffKey::Added(app) | DiffKey::Deleted(app) => app,
        }
    }
}

/// A single consumed-service change inside a partial update.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "op", content = "service", rename_all = "lowercase")]
pub enum ServiceChange {
    /// Newly consumed service
    Added(String),
    /// Service no longer consumed
    Removed(String),
}

impl ServiceChange {
    /// The service name.
    pub fn service(&self) -> &str {
        match self {
            ServiceChange::Added(svc) | ServiceChange::Removed(svc) => svc,
        }
    }

    /// Whether this change removes a dependency.
    pub fn is_removal(&self) -> bool {
        matches!(self, ServiceChange::Removed(_))
    }
}

/// Change recorded for one application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DiffEntry {
    /// Application is new; carries its current model
    Added(CallModel),
    /// Application vanished; carries its previous model
    Deleted(CallModel),
    /// Consumed services changed
    Consumes(BTreeSet<ServiceChange>),
}

/// Diff between two global views, keyed by application name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diff {
    entries: BTreeMap<String, DiffEntry>,
}

impl Diff {
    /// Compute the diff that turns `previous` into `current`.
    pub fn between(previous: &GlobalView, current: &GlobalView) -> Self {
        let mut entries = BTreeMap::new();

        for (app, model) in previous {
            if !current.contains_key(app) {
                entries.insert(app.clone(), DiffEntry::Deleted(model.clone()));
            }
        }

        for (app, model) in current {
            let Some(prev) = previous.get(app) else {
                entries.insert(app.clone(), DiffEntry::Added(model.clone()));
                continue;
            };

            let changes: BTreeSet<ServiceChange> = prev
                .consumes
                .difference(&model.consumes)
                .map(|svc| ServiceChange::Removed(svc.clone()))
                .chain(
                    model
                        .consumes
                        .difference(&prev.consumes)
                        .map(|svc| ServiceChange::Added(svc.clone())),
                )
                .collect();

            if !changes.is_empty() {
                entries.insert(app.clone(), DiffEntry::Consumes(changes));
            }
        }

        Self { entries }
    }

    /// Number of applications in the diff.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the diff is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up the entry for an application.
    pub fn get(&self, application: &str) -> Option<&DiffEntry> {
        self.entries.get(application)
    }

    /// Iterate over typed keys and entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = (DiffKey<'_>, &DiffEntry)> {
        self.entries.iter().map(|(app, entry)| {
            let key = match entry {
                DiffEntry::Added(_) => DiffKey::Added(app),
                DiffEntry::Deleted(_) => DiffKey::Deleted(app),
                DiffEntry::Consumes(_) => DiffKey::Bare(app),
            };
            (key, entry)
        })
    }

    /// Application names present in the diff.
    pub fn applications(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Keep only the entries for which `f` returns true. `f` may prune the
    /// entry in place.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&String, &mut DiffEntry) -> bool,
    {
        self.entries.retain(f);
    }

    /// Apply this diff's consumed-service changes to `base`.
    ///
    /// Applying `Diff::between(a, b)` to `a` reproduces the `consumes`
    /// sets of `b`.
    pub fn apply_to(&self, base: &GlobalView) -> GlobalView {
        let mut out = base.clone();

        for (app, entry) in &self.entries {
            match entry {
                DiffEntry::Added(model) => {
                    out.insert(app.clone(), model.clone());
                }
                DiffEntry::Deleted(_) => {
                    out.remove(app);
                }
                DiffEntry::Consumes(changes) => {
                    let model = out
                        .entry(app.clone())
                        .or_insert_with(|| CallModel::new(app.clone()));
                    for change in changes {
                        match change {
                            ServiceChange::Added(svc) => {
                                model.consumes.insert(svc.clone());
                            }
                            ServiceChange::Removed(svc) => {
                                model.consumes.remove(svc);
                            }
                        }
                    }
                }
            }
        }

        out
    }
}

impl<'a> IntoIterator for &'a Diff {
    type Item = (&'a String, &'a DiffEntry);
    type IntoIter = btree_map::Iter<'a, String, DiffEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, DiffEntry)> for Diff {
    fn from_iter<T: IntoIterator<Item = (String, DiffEntry)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
