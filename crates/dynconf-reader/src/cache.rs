//! Lock-free snapshot cache of one application scope.
//!
//! Readers load the current [`CacheSnapshot`] through an [`ArcSwap`] and never
//! block. Writers build a new snapshot and publish it atomically, either as a
//! full replacement after a reload or as a single-key change after a write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dynconf_storage::ConfigEntry;

/// Immutable view of the cached entries.
///
/// Entries are keyed by id. A secondary index maps each name to the id that
/// answers typed reads: when several active entries share a name, the one
/// with the highest id wins.
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    by_id: HashMap<i64, Arc<ConfigEntry>>,
    by_name: HashMap<String, i64>,
}

impl CacheSnapshot {
    /// Builds a snapshot from rows, keeping only those visible to `application_name`.
    pub fn from_entries(
        application_name: &str,
        entries: impl IntoIterator<Item = ConfigEntry>,
    ) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            if entry.is_visible_to(application_name) {
                snapshot.insert_entry(Arc::new(entry));
            }
        }
        snapshot
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Looks up the entry that answers reads of `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<ConfigEntry>> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Copies the snapshot into an id-ordered map.
    pub fn to_map(&self) -> BTreeMap<i64, ConfigEntry> {
        self.by_id
            .iter()
            .map(|(id, entry)| (*id, ConfigEntry::clone(entry)))
            .collect()
    }

    /// Returns a copy with `entry` stored under its id.
    fn with_entry(&self, entry: Arc<ConfigEntry>) -> Self {
        let mut next = self.clone();
        next.remove_entry(entry.id);
        next.insert_entry(entry);
        next
    }

    /// Returns a copy without `id`.
    fn without(&self, id: i64) -> Self {
        let mut next = self.clone();
        next.remove_entry(id);
        next
    }

    fn insert_entry(&mut self, entry: Arc<ConfigEntry>) {
        let id = entry.id;
        self.by_name
            .entry(entry.name.clone())
            .and_modify(|current| *current = (*current).max(id))
            .or_insert(id);
        self.by_id.insert(id, entry);
    }

    fn remove_entry(&mut self, id: i64) {
        let Some(old) = self.by_id.remove(&id) else {
            return;
        };
        if self.by_name.get(&old.name) != Some(&id) {
            return;
        }
        // Fall back to the next-highest id carrying the same name.
        let fallback = self
            .by_id
            .values()
            .filter(|e| e.name == old.name)
            .map(|e| e.id)
            .max();
        match fallback {
            Some(next) => {
                self.by_name.insert(old.name.clone(), next);
            }
            None => {
                self.by_name.remove(&old.name);
            }
        }
    }
}

/// Shared cache bound to one application scope.
#[derive(Debug)]
pub struct EntryCache {
    application_name: String,
    snapshot: ArcSwap<CacheSnapshot>,
}

impl EntryCache {
    /// Creates an empty cache for `application_name`.
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            snapshot: ArcSwap::from_pointee(CacheSnapshot::default()),
        }
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Returns the current snapshot. It stays valid and unchanged for as
    /// long as the caller holds it.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.snapshot.load_full()
    }

    /// Replaces the whole contents in one atomic step. Returns the number of
    /// entries now cached.
    pub fn replace_all(&self, entries: impl IntoIterator<Item = ConfigEntry>) -> usize {
        let next = CacheSnapshot::from_entries(&self.application_name, entries);
        let count = next.len();
        self.snapshot.store(Arc::new(next));
        count
    }

    /// Stores `entry` under its id.
    ///
    /// An entry that is inactive or belongs to another application is not
    /// stored; any cached copy with the same id is evicted instead.
    pub fn set(&self, entry: ConfigEntry) {
        if !entry.is_visible_to(&self.application_name) {
            self.remove(entry.id);
            return;
        }
        let entry = Arc::new(entry);
        self.snapshot
            .rcu(|current| Arc::new(current.with_entry(Arc::clone(&entry))));
    }

    /// Evicts `id`. Returns `true` if it was cached.
    pub fn remove(&self, id: i64) -> bool {
        let previous = self.snapshot.rcu(|current| Arc::new(current.without(id)));
        previous.contains_id(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<ConfigEntry>> {
        self.snapshot.load().get_by_name(name).cloned()
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.snapshot.load().contains_id(id)
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str, value: &str, app: &str, active: bool) -> ConfigEntry {
        ConfigEntry {
            id,
            name: name.to_string(),
            value_type: "string".to_string(),
            value: value.to_string(),
            is_active: active,
            application_name: app.to_string(),
        }
    }

    #[test]
    fn test_replace_all_filters_scope() {
        let cache = EntryCache::new("SERVICE-A");
        let count = cache.replace_all(vec![
            entry(1, "SiteName", "Acme", "SERVICE-A", true),
            entry(2, "SiteName", "Other", "SERVICE-B", true),
            entry(3, "IsBasketEnabled", "true", "SERVICE-A", false),
        ]);

        assert_eq!(count, 1);
        assert_eq!(cache.get_by_name("SiteName").unwrap().value, "Acme");
        assert!(cache.get_by_name("IsBasketEnabled").is_none());
        assert!(!cache.contains_id(2));
    }

    #[test]
    fn test_replace_all_drops_missing_entries() {
        let cache = EntryCache::new("SERVICE-A");
        cache.replace_all(vec![
            entry(1, "A", "1", "SERVICE-A", true),
            entry(2, "B", "2", "SERVICE-A", true),
        ]);
        cache.replace_all(vec![entry(2, "B", "3", "SERVICE-A", true)]);

        assert_eq!(cache.len(), 1);
        assert!(cache.get_by_name("A").is_none());
        assert_eq!(cache.get_by_name("B").unwrap().value, "3");
    }

    #[test]
    fn test_duplicate_names_resolve_to_highest_id() {
        let cache = EntryCache::new("SERVICE-A");
        cache.replace_all(vec![
            entry(5, "SiteName", "newer", "SERVICE-A", true),
            entry(2, "SiteName", "older", "SERVICE-A", true),
        ]);
        assert_eq!(cache.get_by_name("SiteName").unwrap().id, 5);

        assert!(cache.remove(5));
        assert_eq!(cache.get_by_name("SiteName").unwrap().value, "older");

        assert!(cache.remove(2));
        assert!(cache.get_by_name("SiteName").is_none());
    }

    #[test]
    fn test_rename_moves_name_index() {
        let cache = EntryCache::new("SERVICE-A");
        cache.set(entry(1, "Old", "v", "SERVICE-A", true));
        cache.set(entry(1, "New", "v", "SERVICE-A", true));

        assert!(cache.get_by_name("Old").is_none());
        assert_eq!(cache.get_by_name("New").unwrap().id, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_set_out_of_scope_evicts() {
        let cache = EntryCache::new("SERVICE-A");
        cache.set(entry(1, "SiteName", "Acme", "SERVICE-A", true));

        cache.set(entry(1, "SiteName", "Acme", "SERVICE-B", true));
        assert!(cache.is_empty());

        cache.set(entry(2, "SiteName", "Acme", "SERVICE-A", false));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_reports_presence() {
        let cache = EntryCache::new("SERVICE-A");
        cache.set(entry(1, "A", "1", "SERVICE-A", true));
        assert!(cache.remove(1));
        assert!(!cache.remove(1));
    }

    #[test]
    fn test_held_snapshot_is_stable() {
        let cache = EntryCache::new("SERVICE-A");
        cache.set(entry(1, "A", "1", "SERVICE-A", true));

        let held = cache.snapshot();
        cache.set(entry(2, "B", "2", "SERVICE-A", true));
        cache.remove(1);

        assert_eq!(held.len(), 1);
        assert!(held.contains_id(1));
        assert_eq!(cache.snapshot().len(), 1);
        assert!(cache.contains_id(2));
    }

    #[test]
    fn test_to_map_is_ordered_by_id() {
        let cache = EntryCache::new("SERVICE-A");
        cache.replace_all(vec![
            entry(9, "C", "3", "SERVICE-A", true),
            entry(1, "A", "1", "SERVICE-A", true),
            entry(4, "B", "2", "SERVICE-A", true),
        ]);
        let ids: Vec<i64> = cache.snapshot().to_map().keys().copied().collect();
        assert_eq!(ids, vec![1, 4, 9]);
    }
}
