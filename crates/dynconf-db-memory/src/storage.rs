use dynconf_storage::{ConfigEntry, EntryFields, StorageError};
use papaya::HashMap as PapayaHashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

/// In-memory configuration table using papaya lock-free HashMap.
///
/// This store provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Monotonic store-assigned ids starting at 1
/// - Soft delete; rows only disappear through [`purge`](Self::purge)
/// - An availability switch and artificial latency for failure injection
#[derive(Debug)]
pub struct InMemoryConfigStore {
    /// Rows keyed by id
    pub(crate) data: Arc<PapayaHashMap<i64, ConfigEntry>>,
    /// Next id to hand out
    next_id: AtomicI64,
    /// When false every call fails with a connection error
    available: AtomicBool,
    /// Artificial per-call latency in milliseconds
    latency_ms: AtomicU64,
    /// Number of `query_active` calls served, successful or not
    queries: AtomicU64,
}

impl InMemoryConfigStore {
    /// Creates an empty, available store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            next_id: AtomicI64::new(1),
            available: AtomicBool::new(true),
            latency_ms: AtomicU64::new(0),
            queries: AtomicU64::new(0),
        }
    }

    /// Creates a store pre-populated with the given rows, ids assigned in order.
    pub fn with_entries(entries: impl IntoIterator<Item = EntryFields>) -> Self {
        let store = Self::new();
        for fields in entries {
            store.insert_row(fields);
        }
        store
    }

    /// Switches the store between reachable and unreachable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of scope queries served so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }

    /// Returns every row, active or not, ordered by id.
    pub fn rows(&self) -> Vec<ConfigEntry> {
        let guard = self.data.pin();
        let mut rows: Vec<ConfigEntry> = guard.iter().map(|(_, row)| row.clone()).collect();
        rows.sort_by_key(|row| row.id);
        rows
    }

    /// Number of rows, active or not.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes a row outright, as a manual cleanup of the table would.
    /// Returns `true` if the row existed.
    pub fn purge(&self, id: i64) -> bool {
        self.data.pin().remove(&id).is_some()
    }

    pub(crate) fn insert_row(&self, fields: EntryFields) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let guard = self.data.pin();
        guard.insert(id, ConfigEntry::from_fields(id, fields));
        id
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::SeqCst);
    }

    /// Waits out the configured latency, then fails if the store is switched off.
    pub(crate) async fn round_trip(&self) -> Result<(), StorageError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::connection_error("in-memory store is unavailable"))
        }
    }
}

impl Default for InMemoryConfigStore {
    fn default() -> Self {
        Self::new()
    }
}
