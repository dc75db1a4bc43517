use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EcoStore, StoreKey};
use crate::scoring::ScoreResult;

pub const MAX_CACHE_ENTRIES: usize = 500;
pub const EVICTION_BATCH: usize = 100;
pub const CACHE_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub value: ScoreResult,
    #[serde(rename = "cachedAt")]
    pub cached_at_epoch_millis: i64,
}

impl CacheEntry {
    fn is_expired(&self, now: i64) -> bool {
        now - self.cached_at_epoch_millis > CACHE_TTL_MILLIS
    }
}

type CacheMap = BTreeMap<String, CacheEntry>;

/// Product identity used as the cache key: the title, prefixed with the
/// site-specific id when one is known.
pub fn cache_key(title: &str, site_id: Option<&str>) -> String {
    let title = title.trim();
    match site_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => format!("{id}:{title}"),
        None => title.to_string(),
    }
}

/// Scoring results keyed by product identity, expiring after 24 hours and
/// trimmed in bulk once more than [`MAX_CACHE_ENTRIES`] are held.
#[derive(Debug, Clone)]
pub struct SustainabilityCache {
    store: EcoStore,
}

impl SustainabilityCache {
    pub(super) fn new(store: EcoStore) -> Self {
        Self { store }
    }

    fn entries(&self) -> CacheMap {
        self.store.read(StoreKey::SustainabilityCache)
    }

    /// Expired entries read as a miss but stay in place until the next
    /// eviction pass or `clear`.
    pub fn get(&self, key: &str) -> Option<ScoreResult> {
        let now = self.store.now_millis();
        let entries = self.entries();
        let entry = entries.get(key)?;
        if entry.is_expired(now) {
            debug!(key, "cache entry expired");
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: &str, value: ScoreResult) {
        let now = self.store.now_millis();
        let mut entries = self.entries();
        entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                value,
                cached_at_epoch_millis: now,
            },
        );

        if entries.len() > MAX_CACHE_ENTRIES {
            let evicted = evict_oldest(&mut entries, EVICTION_BATCH);
            debug!(evicted, remaining = entries.len(), "cache eviction pass");
        }

        self.store.write(StoreKey::SustainabilityCache, &entries);
    }

    pub fn clear(&self) {
        self.store.remove(StoreKey::SustainabilityCache);
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn evict_oldest(entries: &mut CacheMap, count: usize) -> usize {
    let mut by_age: Vec<(i64, String)> = entries
        .values()
        .map(|entry| (entry.cached_at_epoch_millis, entry.key.clone()))
        .collect();
    by_age.sort_by_key(|(cached_at, _)| *cached_at);

    let mut evicted = 0;
    for (_, key) in by_age.into_iter().take(count) {
        if entries.remove(&key).is_some() {
            evicted += 1;
        }
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::grade::Grade;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn store_at(start: i64) -> (EcoStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(start));
        let store = EcoStore::new(Arc::new(MemoryStore::default()), clock.clone());
        (store, clock)
    }

    fn graded(grade: Grade) -> ScoreResult {
        let mut result = ScoreResult::fallback("test");
        result.grade = grade;
        result.is_fallback = false;
        result.message = None;
        result
    }

    #[test]
    fn cache_key_prefixes_site_id() {
        assert_eq!(cache_key(" Hemp Tote ", Some("B0123")), "B0123:Hemp Tote");
        assert_eq!(cache_key("Hemp Tote", Some("  ")), "Hemp Tote");
        assert_eq!(cache_key("Hemp Tote", None), "Hemp Tote");
    }

    #[test]
    fn put_then_get_returns_value() {
        let (store, _clock) = store_at(1_000);
        let cache = store.cache();
        cache.put("bamboo", graded(Grade::A));
        assert_eq!(cache.get("bamboo").map(|r| r.grade), Some(Grade::A));
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn put_overwrites_and_restamps_existing_key() {
        let (store, clock) = store_at(0);
        let cache = store.cache();
        cache.put("mug", graded(Grade::C));
        clock.advance(CACHE_TTL_MILLIS);
        cache.put("mug", graded(Grade::B));
        clock.advance(CACHE_TTL_MILLIS);
        assert_eq!(cache.get("mug").map(|r| r.grade), Some(Grade::B));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn expired_entry_misses_but_is_not_deleted() {
        let (store, clock) = store_at(0);
        let cache = store.cache();
        cache.put("straws", graded(Grade::E));

        clock.set(CACHE_TTL_MILLIS);
        assert!(cache.get("straws").is_some(), "exactly 24h is still fresh");

        clock.set(CACHE_TTL_MILLIS + 1);
        assert!(cache.get("straws").is_none());
        assert_eq!(cache.len(), 1, "expiry check must not delete");
    }

    #[test]
    fn eviction_removes_exactly_the_hundred_oldest() {
        let (store, clock) = store_at(0);
        let cache = store.cache();

        for index in 0..MAX_CACHE_ENTRIES {
            cache.put(&format!("product-{index:03}"), graded(Grade::B));
            clock.advance(1);
            assert!(cache.len() <= MAX_CACHE_ENTRIES);
        }
        assert_eq!(cache.len(), MAX_CACHE_ENTRIES);

        cache.put("product-new", graded(Grade::A));

        assert_eq!(cache.len(), MAX_CACHE_ENTRIES + 1 - EVICTION_BATCH);
        for index in 0..EVICTION_BATCH {
            assert!(cache.get(&format!("product-{index:03}")).is_none());
        }
        assert!(cache.get(&format!("product-{EVICTION_BATCH:03}")).is_some());
        assert!(cache.get("product-new").is_some());
    }

    #[test]
    fn eviction_orders_by_timestamp_not_key() {
        let (store, clock) = store_at(0);
        let cache = store.cache();

        // Insert keys in reverse lexical order so key order and age disagree.
        for index in (0..=MAX_CACHE_ENTRIES).rev() {
            cache.put(&format!("k{index:03}"), graded(Grade::C));
            clock.advance(1);
        }

        assert_eq!(cache.len(), MAX_CACHE_ENTRIES + 1 - EVICTION_BATCH);
        assert!(cache.get(&format!("k{MAX_CACHE_ENTRIES:03}")).is_none());
        assert!(cache.get("k000").is_some());
    }

    #[test]
    fn clear_removes_everything() {
        let (store, _clock) = store_at(0);
        let cache = store.cache();
        cache.put("a", graded(Grade::A));
        cache.put("b", graded(Grade::B));
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.get("a").is_none());
    }
}
