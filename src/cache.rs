//! Query cache keyed by (collection, id, filter parameters).
//!
//! Entries hold the most recent successfully-fetched value. Invalidation
//! marks entries stale; stale entries are never served, forcing readers
//! to refetch. Writes are last-completion-wins: a later-completing fetch
//! overwrites an earlier one regardless of issue order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::mutation::MutationKind;

/// Composite cache key; equality is structural over all components
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    collection: String,
    id: Option<String>,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    /// Key for a whole collection listing
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            id: None,
            params: BTreeMap::new(),
        }
    }

    /// Key for a single entity
    pub fn entity(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            id: Some(id.into()),
            params: BTreeMap::new(),
        }
    }

    /// Key for a filtered collection listing
    pub fn filtered<I, K, V>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            collection: name.into(),
            id: None,
            params: params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stale: bool,
    stored_at: DateTime<Utc>,
}

/// Process-wide query cache
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh value for the key, if any. Stale entries are not served.
    pub fn get(&self, key: &QueryKey) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| !entry.stale)
            .map(|entry| &entry.value)
    }

    /// Unconditional overwrite; clears any stale mark.
    pub fn set(&mut self, key: QueryKey, value: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stale: false,
                stored_at: Utc::now(),
            },
        );
    }

    /// When the entry for `key` was last stored, stale or not
    pub fn stored_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).map(|entry| entry.stored_at)
    }

    /// Mark every entry matching the predicate stale
    pub fn invalidate_matching(&mut self, predicate: impl Fn(&QueryKey) -> bool) {
        for (key, entry) in self.entries.iter_mut() {
            if predicate(key) {
                entry.stale = true;
            }
        }
    }

    /// Mark stale every entry whose collection name starts with the
    /// prefix, across all id/filter variants (so "tasks" also covers
    /// derived collections like "tasks/unassigned")
    pub fn invalidate_collection(&mut self, prefix: &str) {
        self.invalidate_matching(|key| key.collection_name().starts_with(prefix));
    }

    /// Apply the static invalidation set for a successful mutation
    pub fn apply_mutation(&mut self, kind: MutationKind) {
        for collection in invalidation_targets(kind) {
            self.invalidate_collection(collection);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collections each mutation kind invalidates on success.
///
/// This table is the single source of truth; under-invalidation means
/// stale views, so new mutation kinds must be added here first.
pub fn invalidation_targets(kind: MutationKind) -> &'static [&'static str] {
    match kind {
        MutationKind::CreateProject => &["projects"],
        MutationKind::UpdateProject => &["projects"],
        MutationKind::CreateTask => &["tasks", "projects"],
        MutationKind::UpdateTask => &["tasks", "projects"],
        MutationKind::UpdateTaskStatus => &["tasks", "projects", "workload"],
        MutationKind::AssignTask => &["tasks", "projects", "workload", "nudges"],
        MutationKind::UnassignTask => &["tasks", "projects", "workload", "nudges"],
        MutationKind::DeleteTask => &["tasks", "projects", "workload"],
        MutationKind::UpdateNudgeStatus => &["nudges"],
        MutationKind::TakeNudgeAction => &["nudges", "tasks", "workload"],
        MutationKind::CreateScenario => &["scenarios"],
        MutationKind::SimulateScenario => &["scenarios"],
        MutationKind::ApplyScenario => &["scenarios", "tasks", "projects", "workload", "nudges"],
    }
}
