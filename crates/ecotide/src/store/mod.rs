//! Persistent state shared by the page scanner and the dashboard.
//!
//! Everything lives behind one [`KeyValueStore`] addressed by [`StoreKey`].
//! The typed facades (cache, history, settings, progress) read and write whole
//! logical keys; store failures are logged and degrade to empty/default state
//! rather than failing the caller.

mod cache;
mod file;
mod history;
mod memory;
mod progress;
mod settings;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::clock::{Clock, SystemClock};
use crate::scoring::ScoreResult;

pub use cache::{
    cache_key, CacheEntry, SustainabilityCache, CACHE_TTL_MILLIS, EVICTION_BATCH, MAX_CACHE_ENTRIES,
};
pub use file::JsonFileStore;
pub use history::{EventHistory, HistoryEvent, MAX_HISTORY_ENTRIES};
pub use memory::MemoryStore;
pub use progress::{ProgressStore, UserProgress};
pub use settings::{Settings, SettingsPatch, SettingsStore, DEFAULT_API_ENDPOINT};

/// Logical keys of the persisted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    EcoData,
    SustainabilityCache,
    UserProgress,
    Settings,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            StoreKey::EcoData => "ecoData",
            StoreKey::SustainabilityCache => "sustainabilityCache",
            StoreKey::UserProgress => "userProgress",
            StoreKey::Settings => "settings",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage abstraction over the medium holding extension state.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: StoreKey) -> Result<Option<Value>, StoreError>;
    fn save(&self, key: StoreKey, value: Value) -> Result<(), StoreError>;
    fn remove(&self, key: StoreKey) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("store document {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Cheap-to-clone handle over the shared store and the clock used to stamp
/// cache entries and history events.
#[derive(Clone)]
pub struct EcoStore {
    backend: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for EcoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcoStore").finish_non_exhaustive()
    }
}

impl EcoStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { backend, clock }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()), Arc::new(SystemClock))
    }

    /// Opens (creating if needed) the JSON document at `path`.
    pub fn open_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let backend = JsonFileStore::open(path)?;
        Ok(Self::new(Arc::new(backend), Arc::new(SystemClock)))
    }

    pub fn cache(&self) -> SustainabilityCache {
        SustainabilityCache::new(self.clone())
    }

    pub fn history(&self) -> EventHistory {
        EventHistory::new(self.clone())
    }

    pub fn settings(&self) -> SettingsStore {
        SettingsStore::new(self.clone())
    }

    pub fn progress(&self) -> ProgressStore {
        ProgressStore::new(self.clone())
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Appends a "viewed with grade X" event and refreshes the legacy
    /// progress blob from the resulting history.
    pub fn record_view(&self, product: &str, result: &ScoreResult) -> HistoryEvent {
        let event = HistoryEvent {
            product: product.to_string(),
            grade: result.grade,
            co2_impact: result.co2_impact.clone(),
            timestamp_epoch_millis: self.now_millis(),
        };
        let history = self.history();
        history.append(event.clone());
        self.progress().refresh(&history.all());
        event
    }

    pub(crate) fn read<T>(&self, key: StoreKey) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.backend.load(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(%key, error = %err, "stored value has unexpected shape, using default");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(err) => {
                warn!(%key, error = %err, "store read failed, using default");
                T::default()
            }
        }
    }

    pub(crate) fn write<T>(&self, key: StoreKey, value: &T)
    where
        T: Serialize,
    {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => {
                warn!(%key, error = %err, "unable to serialize value, write dropped");
                return;
            }
        };
        if let Err(err) = self.backend.save(key, value) {
            warn!(%key, error = %err, "store write failed");
        }
    }

    pub(crate) fn remove(&self, key: StoreKey) {
        if let Err(err) = self.backend.remove(key) {
            warn!(%key, error = %err, "store remove failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::grade::Grade;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn load(&self, _key: StoreKey) -> Result<Option<Value>, StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }

        fn save(&self, _key: StoreKey, _value: Value) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }

        fn remove(&self, _key: StoreKey) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".to_string()))
        }
    }

    #[test]
    fn failing_backend_degrades_to_defaults() {
        let store = EcoStore::new(Arc::new(BrokenStore), Arc::new(ManualClock::default()));

        assert!(store.history().all().is_empty());
        assert_eq!(store.settings().get(), Settings::default());
        assert!(store.cache().get("anything").is_none());

        store.record_view("Bamboo Toothbrush", &ScoreResult::fallback("n/a"));
        store.cache().clear();
        assert!(store.history().all().is_empty());
    }

    #[test]
    fn malformed_value_is_treated_as_empty() {
        let backend = Arc::new(MemoryStore::default());
        backend
            .save(StoreKey::EcoData, serde_json::json!({ "not": "a list" }))
            .expect("memory save");
        let store = EcoStore::new(backend, Arc::new(ManualClock::default()));
        assert!(store.history().all().is_empty());
    }

    #[test]
    fn record_view_stamps_event_with_clock() {
        let clock = Arc::new(ManualClock::starting_at(42_000));
        let store = EcoStore::new(Arc::new(MemoryStore::default()), clock);
        let mut result = ScoreResult::fallback("unused");
        result.grade = Grade::A;
        result.co2_impact = "1.2 kg CO2".to_string();

        let event = store.record_view("Solar Charger", &result);

        assert_eq!(event.timestamp_epoch_millis, 42_000);
        assert_eq!(store.history().all(), vec![event]);
        assert_eq!(store.progress().get().total_products, 1);
    }
}
