//! The configuration reader: scoped cache, refresh loop and write-through.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dynconf_storage::{ConfigEntry, DynConfigStore, EntryFields};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::cache::EntryCache;
use crate::convert::{ConfigValue, TypedValue, ValueKind};
use crate::refresh::{Refresh, RefreshHandle};
use crate::{ConfigError, Result};

/// Default delay between the starts of two refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(5000);

/// Lifecycle of the reader's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderState {
    Uninitialized,
    /// Initial load in progress.
    Loading,
    Ready,
    /// Periodic or explicit reload in progress; reads still served.
    Refreshing,
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::Loading => write!(f, "loading"),
            Self::Ready => write!(f, "ready"),
            Self::Refreshing => write!(f, "refreshing"),
        }
    }
}

/// Result of a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReloadOutcome {
    /// The loaded rows replaced the cache.
    Applied { entries: usize },
    /// A mutation committed while the rows were loading. They were queried
    /// again with writes held off, and that result replaced the cache.
    Requeried { entries: usize },
}

impl ReloadOutcome {
    /// Number of entries cached after the reload.
    pub fn entries(&self) -> usize {
        match *self {
            Self::Applied { entries } | Self::Requeried { entries } => entries,
        }
    }
}

/// Diagnostics about the reload history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadStatus {
    pub state: ReaderState,
    /// Successfully applied reloads, including the initial one.
    pub reload_count: u64,
    pub consecutive_failures: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_attempt: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_success: Option<OffsetDateTime>,
    pub last_error: Option<String>,
    /// Entry count of the last applied reload.
    pub last_loaded: Option<usize>,
}

impl Default for ReloadStatus {
    fn default() -> Self {
        Self {
            state: ReaderState::Uninitialized,
            reload_count: 0,
            consecutive_failures: 0,
            last_attempt: None,
            last_success: None,
            last_error: None,
            last_loaded: None,
        }
    }
}

struct ReaderInner {
    store: DynConfigStore,
    cache: EntryCache,
    refresh_interval: Duration,
    /// Serializes store writes with their cache application.
    mutation_lock: tokio::sync::Mutex<()>,
    reload_lock: tokio::sync::Mutex<()>,
    /// Bumped after every applied mutation.
    write_epoch: AtomicU64,
    status: Mutex<ReloadStatus>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl ReaderInner {
    fn application_name(&self) -> &str {
        self.cache.application_name()
    }

    fn status(&self) -> MutexGuard<'_, ReloadStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_handle(&self) -> MutexGuard<'_, Option<RefreshHandle>> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[instrument(
        skip(self),
        fields(application = %self.application_name(), backend = self.store.backend_name())
    )]
    async fn reload(&self) -> Result<ReloadOutcome> {
        let _reload = self.reload_lock.lock().await;

        let epoch = self.write_epoch.load(Ordering::Acquire);
        {
            let mut status = self.status();
            status.state = match status.state {
                ReaderState::Uninitialized | ReaderState::Loading => ReaderState::Loading,
                ReaderState::Ready | ReaderState::Refreshing => ReaderState::Refreshing,
            };
            status.last_attempt = Some(OffsetDateTime::now_utc());
        }

        let rows = self.load_scope().await?;

        let _mutation = self.mutation_lock.lock().await;
        let requeried = self.write_epoch.load(Ordering::Acquire) != epoch;
        let rows = if requeried {
            // Writes wait on the mutation lock, so this result stays current.
            debug!("Mutation committed during reload, querying again");
            self.load_scope().await?
        } else {
            rows
        };

        let entries = self.cache.replace_all(rows);
        {
            let mut status = self.status();
            status.state = ReaderState::Ready;
            status.reload_count += 1;
            status.consecutive_failures = 0;
            status.last_success = status.last_attempt;
            status.last_error = None;
            status.last_loaded = Some(entries);
        }
        debug!(entries, requeried, "Configuration reloaded");

        Ok(if requeried {
            ReloadOutcome::Requeried { entries }
        } else {
            ReloadOutcome::Applied { entries }
        })
    }

    /// Queries the scope's active rows. A failure is logged and recorded in
    /// the status; the cache is left alone.
    async fn load_scope(&self) -> Result<Vec<ConfigEntry>> {
        let rows = match self.store.query_active(self.application_name()).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(
                    error = %e,
                    category = %e.category(),
                    "Configuration reload failed, keeping previous entries"
                );
                let mut status = self.status();
                status.state = ReaderState::Ready;
                status.consecutive_failures += 1;
                status.last_error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let fetched = rows.len();
        let rows: Vec<ConfigEntry> = rows
            .into_iter()
            .filter(|row| row.is_visible_to(self.application_name()))
            .collect();
        if rows.len() != fetched {
            warn!(
                dropped = fetched - rows.len(),
                "Store returned rows outside the reader scope"
            );
        }
        Ok(rows)
    }

    fn mark_written(&self) {
        self.write_epoch.fetch_add(1, Ordering::Release);
    }
}

#[async_trait]
impl Refresh for ReaderInner {
    async fn refresh_tick(&self) {
        // Failures are already logged and recorded in the status.
        let _ = self.reload().await;
    }
}

impl Drop for ReaderInner {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_handle().take() {
            handle.abort();
        }
    }
}

/// Periodically refreshed, write-through cache of one application's
/// configuration entries.
///
/// Cloning is cheap and every clone shares the same cache and refresh task.
/// The task stops on [`shutdown`](Self::shutdown) or when the last clone is
/// dropped.
#[derive(Clone)]
pub struct ConfigurationReader {
    inner: Arc<ReaderInner>,
}

impl ConfigurationReader {
    pub fn builder() -> ConfigurationReaderBuilder {
        ConfigurationReaderBuilder::default()
    }

    /// Creates a reader with the default options and loads it.
    pub async fn new(
        application_name: impl Into<String>,
        store: DynConfigStore,
        refresh_interval: Duration,
    ) -> Result<Self> {
        Self::builder()
            .application_name(application_name)
            .store(store)
            .refresh_interval(refresh_interval)
            .build()
            .await
    }

    pub fn application_name(&self) -> &str {
        self.inner.application_name()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.refresh_interval
    }

    /// Reads `name` and converts its value to `T`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if no active entry of this scope has the name
    /// - [`ConfigError::Conversion`] if the value does not parse as `T`
    pub fn get_value<T: ConfigValue>(&self, name: &str) -> Result<T> {
        let entry = self
            .inner
            .cache
            .get_by_name(name)
            .ok_or_else(|| ConfigError::not_found_name(name))?;

        T::parse_config(&entry.value)
            .ok_or_else(|| ConfigError::conversion(name, T::TYPE_NAME, entry.value.as_str()))
    }

    /// Like [`get_value`](Self::get_value), but returns `default` when the
    /// name is not found. Conversion failures are still errors.
    pub fn get_value_or<T: ConfigValue>(&self, name: &str, default: T) -> Result<T> {
        match self.get_value(name) {
            Err(ConfigError::NotFound(_)) => Ok(default),
            other => other,
        }
    }

    pub fn get_entry(&self, name: &str) -> Option<ConfigEntry> {
        self.inner
            .cache
            .get_by_name(name)
            .map(|entry| ConfigEntry::clone(&entry))
    }

    /// Reads `name` and converts it according to its declared type tag.
    pub fn get_typed(&self, name: &str) -> Result<TypedValue> {
        let entry = self
            .inner
            .cache
            .get_by_name(name)
            .ok_or_else(|| ConfigError::not_found_name(name))?;
        ValueKind::from_tag(&entry.value_type).convert(name, &entry.value)
    }

    /// Reads `name` and converts it to `kind`, ignoring the declared tag.
    pub fn get_as(&self, name: &str, kind: ValueKind) -> Result<TypedValue> {
        let entry = self
            .inner
            .cache
            .get_by_name(name)
            .ok_or_else(|| ConfigError::not_found_name(name))?;
        kind.convert(name, &entry.value)
    }

    /// Returns an independent copy of every cached entry, keyed by id.
    pub fn get_all(&self) -> BTreeMap<i64, ConfigEntry> {
        self.inner.cache.snapshot().to_map()
    }

    pub fn len(&self) -> usize {
        self.inner.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.cache.is_empty()
    }

    /// Inserts a new entry and returns its store-assigned id.
    ///
    /// The entry is mirrored into the cache only if it is active and belongs
    /// to this reader's application.
    #[instrument(skip(self, fields), fields(name = %fields.name))]
    pub async fn insert_value(&self, fields: EntryFields) -> Result<i64> {
        fields.validate()?;

        let _mutation = self.inner.mutation_lock.lock().await;
        let id = self.inner.store.insert(&fields).await?;
        self.inner.mark_written();
        self.inner.cache.set(ConfigEntry::from_fields(id, fields));

        info!(id, "Configuration entry inserted");
        Ok(id)
    }

    /// Rewrites every field of a cached entry.
    ///
    /// The entry is evicted from the cache if the new fields deactivate it
    /// or move it to another application.
    #[instrument(skip(self, fields), fields(name = %fields.name))]
    pub async fn update_value(&self, id: i64, fields: EntryFields) -> Result<()> {
        fields.validate()?;

        let _mutation = self.inner.mutation_lock.lock().await;
        if !self.inner.cache.contains_id(id) {
            return Err(ConfigError::not_found_id(id));
        }

        let affected = self.inner.store.update(id, &fields).await?;
        if affected == 0 {
            return Err(ConfigError::not_found_id(id));
        }
        self.inner.mark_written();
        self.inner.cache.set(ConfigEntry::from_fields(id, fields));

        info!("Configuration entry updated");
        Ok(())
    }

    /// Soft-deletes a cached entry. The row stays in the store, inactive.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        let _mutation = self.inner.mutation_lock.lock().await;
        if !self.inner.cache.contains_id(id) {
            return Err(ConfigError::not_found_id(id));
        }

        let affected = self.inner.store.soft_delete(id).await?;
        if affected == 0 {
            return Err(ConfigError::not_found_id(id));
        }
        self.inner.mark_written();
        self.inner.cache.remove(id);

        info!("Configuration entry deleted");
        Ok(())
    }

    /// Reloads the scope from the store now.
    ///
    /// On failure the previous entries stay in place and the error is
    /// returned; the periodic refresh goes through the same path.
    pub async fn reload(&self) -> Result<ReloadOutcome> {
        self.inner.reload().await
    }

    pub fn state(&self) -> ReaderState {
        self.inner.status().state
    }

    pub fn status(&self) -> ReloadStatus {
        self.inner.status().clone()
    }

    /// Returns `true` while the periodic refresh task is running.
    pub fn is_refreshing_periodically(&self) -> bool {
        self.inner
            .refresh_handle()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the periodic refresh and waits for an in-flight reload to end.
    ///
    /// The cache stays readable and writable afterwards. Calling this more
    /// than once is a no-op.
    pub async fn shutdown(&self) {
        let handle = self.inner.refresh_handle().take();
        if let Some(handle) = handle {
            handle.stop().await;
            info!(application = %self.application_name(), "Configuration refresh stopped");
        }
    }
}

impl fmt::Debug for ConfigurationReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationReader")
            .field("application_name", &self.application_name())
            .field("backend", &self.inner.store.backend_name())
            .field("refresh_interval", &self.inner.refresh_interval)
            .field("entries", &self.len())
            .field("state", &self.state())
            .finish()
    }
}

/// Builder for [`ConfigurationReader`].
#[derive(Clone)]
pub struct ConfigurationReaderBuilder {
    application_name: Option<String>,
    store: Option<DynConfigStore>,
    refresh_interval: Duration,
    require_initial_load: bool,
    auto_refresh: bool,
}

impl Default for ConfigurationReaderBuilder {
    fn default() -> Self {
        Self {
            application_name: None,
            store: None,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            require_initial_load: false,
            auto_refresh: true,
        }
    }
}

impl ConfigurationReaderBuilder {
    /// Scope whose entries the reader mirrors.
    pub fn application_name(mut self, application_name: impl Into<String>) -> Self {
        self.application_name = Some(application_name.into());
        self
    }

    pub fn store(mut self, store: DynConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Delay between the starts of two consecutive refreshes. Must be
    /// positive.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Fail construction when the initial load fails, instead of starting
    /// with an empty cache.
    pub fn require_initial_load(mut self, require: bool) -> Self {
        self.require_initial_load = require;
        self
    }

    /// Spawn the periodic refresh task. Enabled by default.
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// Validates the options, performs the initial load and starts the
    /// refresh task.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn build(self) -> Result<ConfigurationReader> {
        let application_name = self
            .application_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| ConfigError::validation("application_name must not be blank"))?;
        let store = self
            .store
            .ok_or_else(|| ConfigError::validation("a configuration store is required"))?;
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::validation("refresh_interval must be positive"));
        }

        let inner = Arc::new(ReaderInner {
            store,
            cache: EntryCache::new(application_name),
            refresh_interval: self.refresh_interval,
            mutation_lock: tokio::sync::Mutex::new(()),
            reload_lock: tokio::sync::Mutex::new(()),
            write_epoch: AtomicU64::new(0),
            status: Mutex::new(ReloadStatus::default()),
            refresh: Mutex::new(None),
        });

        match inner.reload().await {
            Ok(outcome) => {
                info!(
                    application = %inner.application_name(),
                    backend = inner.store.backend_name(),
                    ?outcome,
                    "Configuration reader initialized"
                );
            }
            Err(e) if self.require_initial_load => return Err(e),
            Err(e) => {
                warn!(
                    application = %inner.application_name(),
                    error = %e,
                    "Initial configuration load failed, starting with an empty cache"
                );
            }
        }

        if self.auto_refresh {
            let handle = RefreshHandle::spawn(Arc::downgrade(&inner), inner.refresh_interval);
            *inner.refresh_handle() = Some(handle);
        }

        Ok(ConfigurationReader { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynconf_db_memory::InMemoryConfigStore;
    use tokio_test::block_on;

    const APP: &str = "SERVICE-A";

    fn seeded_store() -> Arc<InMemoryConfigStore> {
        Arc::new(InMemoryConfigStore::with_entries(vec![
            EntryFields::new("SiteName", "string", "Acme", APP),
            EntryFields::new("MaxItemCount", "int", "50", APP),
            EntryFields::new("IsBasketEnabled", "bool", "true", APP),
            EntryFields::new("SiteName", "string", "Other", "SERVICE-B"),
        ]))
    }

    async fn reader_over(store: Arc<InMemoryConfigStore>) -> ConfigurationReader {
        ConfigurationReader::builder()
            .application_name(APP)
            .store(store)
            .auto_refresh(false)
            .build()
            .await
            .unwrap()
    }

    #[test]
    fn test_builder_rejects_invalid_options() {
        let store = seeded_store();

        let err = block_on(
            ConfigurationReader::builder()
                .application_name("  ")
                .store(store.clone())
                .build(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err =
            block_on(ConfigurationReader::builder().application_name(APP).build()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = block_on(
            ConfigurationReader::builder()
                .application_name(APP)
                .store(store)
                .refresh_interval(Duration::ZERO)
                .build(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[tokio::test]
    async fn test_initial_load_populates_scope() {
        let reader = reader_over(seeded_store()).await;

        assert_eq!(reader.len(), 3);
        assert_eq!(reader.state(), ReaderState::Ready);
        assert_eq!(reader.get_value::<String>("SiteName").unwrap(), "Acme");
        assert_eq!(reader.get_value::<i32>("MaxItemCount").unwrap(), 50);
        assert!(reader.get_value::<bool>("IsBasketEnabled").unwrap());

        let status = reader.status();
        assert_eq!(status.reload_count, 1);
        assert_eq!(status.last_loaded, Some(3));
        assert!(status.last_success.is_some());
    }

    #[tokio::test]
    async fn test_initial_load_failure_is_absorbed_by_default() {
        let store = seeded_store();
        store.set_available(false);

        let reader = reader_over(store.clone()).await;
        assert!(reader.is_empty());
        assert_eq!(reader.state(), ReaderState::Ready);
        assert_eq!(reader.status().consecutive_failures, 1);
        assert!(reader.status().last_error.is_some());

        store.set_available(true);
        assert_eq!(
            reader.reload().await.unwrap(),
            ReloadOutcome::Applied { entries: 3 }
        );
        assert_eq!(reader.status().consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_initial_load_failure_can_be_required() {
        let store = seeded_store();
        store.set_available(false);

        let err = ConfigurationReader::builder()
            .application_name(APP)
            .store(store)
            .require_initial_load(true)
            .build()
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Connectivity(_)));
    }

    #[tokio::test]
    async fn test_get_value_outcomes_are_disjoint() {
        let reader = reader_over(seeded_store()).await;

        assert!(reader.get_value::<i32>("Missing").unwrap_err().is_not_found());
        assert!(
            reader
                .get_value::<i32>("SiteName")
                .unwrap_err()
                .is_conversion()
        );
        assert_eq!(reader.get_value_or::<i32>("Missing", 7).unwrap(), 7);
        assert!(reader.get_value_or::<i32>("SiteName", 7).is_err());
    }

    #[tokio::test]
    async fn test_get_typed_uses_declared_tag() {
        let reader = reader_over(seeded_store()).await;

        assert_eq!(
            reader.get_typed("MaxItemCount").unwrap(),
            TypedValue::Integer(50)
        );
        assert_eq!(
            reader.get_as("MaxItemCount", ValueKind::String).unwrap(),
            TypedValue::String("50".to_string())
        );
    }

    #[tokio::test]
    async fn test_mutations_require_cached_id() {
        let store = seeded_store();
        let reader = reader_over(store.clone()).await;

        let fields = EntryFields::new("SiteName", "string", "Hijack", APP);
        // Row 4 belongs to SERVICE-B and is never cached here.
        assert!(reader.update_value(4, fields).await.unwrap_err().is_not_found());
        assert!(reader.delete(4).await.unwrap_err().is_not_found());

        let row = store.rows().into_iter().find(|row| row.id == 4).unwrap();
        assert_eq!(row.value, "Other");
        assert_eq!(row.application_name, "SERVICE-B");
        assert!(row.is_active);
    }

    #[tokio::test]
    async fn test_update_out_of_scope_evicts() {
        let reader = reader_over(seeded_store()).await;
        let id = reader.get_entry("MaxItemCount").unwrap().id;

        reader
            .update_value(id, EntryFields::new("MaxItemCount", "int", "50", "SERVICE-B"))
            .await
            .unwrap();

        assert!(reader.get_entry("MaxItemCount").is_none());
        assert!(!reader.get_all().contains_key(&id));
    }

    #[tokio::test]
    async fn test_validation_precedes_store() {
        let store = seeded_store();
        let reader = reader_over(store.clone()).await;

        let err = reader
            .insert_value(EntryFields::new("", "string", "x", APP))
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let reader = ConfigurationReader::builder()
            .application_name(APP)
            .store(seeded_store())
            .refresh_interval(Duration::from_millis(10))
            .build()
            .await
            .unwrap();
        assert!(reader.is_refreshing_periodically());

        reader.shutdown().await;
        reader.shutdown().await;
        assert!(!reader.is_refreshing_periodically());
        assert_eq!(reader.get_value::<String>("SiteName").unwrap(), "Acme");
    }

    #[tokio::test]
    async fn test_debug_output() {
        let reader = reader_over(seeded_store()).await;
        let debug = format!("{reader:?}");
        assert!(debug.contains("SERVICE-A"));
        assert!(debug.contains("memory"));
    }
}
