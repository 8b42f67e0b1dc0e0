//! In-memory watch set.
//!
//! Maps entity ids to their last observed snapshot for the lifetime of one
//! run. Ids that reached a terminal state are retired and can never come back.

use std::collections::{BTreeMap, HashSet};

/// Tracked entities and their last snapshot.
///
/// An entity can be tracked before it has been observed, in which case
/// [`WatchSet::get`] returns `None` for it.
#[derive(Debug, Clone)]
pub struct WatchSet<S> {
    entries: BTreeMap<String, Option<S>>,
    retired: HashSet<String>,
}

impl<S> Default for WatchSet<S> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            retired: HashSet::new(),
        }
    }
}

impl<S> WatchSet<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a watch set from an initial id list, dropping duplicates.
    pub fn from_ids<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut set = Self::new();
        for id in ids {
            set.track(id);
        }
        set
    }

    /// Start tracking `id` without a snapshot.
    ///
    /// Returns `false` if it was already tracked or has been retired.
    pub fn track(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.retired.contains(&id) || self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, None);
        true
    }

    /// Last snapshot recorded for `id`.
    pub fn get(&self, id: &str) -> Option<&S> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    /// Record a new snapshot for `id`, tracking it if needed.
    ///
    /// Returns `false` (and stores nothing) if `id` has been retired.
    pub fn put(&mut self, id: impl Into<String>, snapshot: S) -> bool {
        let id = id.into();
        if self.retired.contains(&id) {
            return false;
        }
        self.entries.insert(id, Some(snapshot));
        true
    }

    /// Stop tracking `id` for the rest of the run.
    ///
    /// Returns the last snapshot, if any.
    pub fn remove(&mut self, id: &str) -> Option<S> {
        self.retired.insert(id.to_string());
        self.entries.remove(id).flatten()
    }

    /// Retire `id` without recording a snapshot for it.
    ///
    /// Returns `false` if it was already retired.
    pub fn retire(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        self.entries.remove(&id);
        self.retired.insert(id)
    }

    /// Whether `id` has been retired.
    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Owned copy of the tracked ids, in stable order.
    ///
    /// Safe to iterate while the set is modified.
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over tracked ids and their snapshots.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&S>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}
