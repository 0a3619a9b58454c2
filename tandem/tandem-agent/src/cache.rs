//! Response cache keyed by normalized prompt.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::config::CacheConfig;
use tandem_core::{CacheEntry, NormalizedKey};

/// Bounded, time-limited map from prompt key to the last successful result.
///
/// One entry per key; a later `put` replaces the earlier one.
pub struct ResponseCache {
    cache: Cache<NormalizedKey, Arc<CacheEntry>>,
}

impl ResponseCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, Duration::from_secs(config.ttl_secs))
    }

    pub async fn get(&self, key: &NormalizedKey) -> Option<CacheEntry> {
        self.cache.get(key).await.map(|entry| entry.as_ref().clone())
    }

    pub async fn put(&self, key: NormalizedKey, entry: CacheEntry) {
        self.cache.insert(key, Arc::new(entry)).await;
    }

    /// Remove the entry for `key`, returning what was cached.
    pub async fn invalidate(&self, key: &NormalizedKey) -> Option<CacheEntry> {
        self.cache
            .remove(key)
            .await
            .map(|entry| entry.as_ref().clone())
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }

    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}
