//! Memoization of journey lengths.
//!
//! Route geometry changes rarely, so computed journey lengths are kept for a
//! long TTL. The cache is bounded by entry count; concurrent misses for the
//! same key each compute and the last insert wins.

use std::time::Duration;

use moka::future::Cache as MokaCache;

use crate::domain::JourneyKey;

/// Configuration for the journey cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for cached entries.
    pub ttl: Duration,

    /// Maximum number of cached entries.
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(24 * 60 * 60),
            max_capacity: 10_000,
        }
    }
}

/// Journey length cache, keyed by (bus, direction, boarding, alighting).
#[derive(Clone)]
pub struct JourneyCache {
    lengths: MokaCache<JourneyKey, f64>,
}

impl JourneyCache {
    /// Create a new cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let lengths = MokaCache::builder()
            .time_to_live(config.ttl)
            .max_capacity(config.max_capacity)
            .build();

        Self { lengths }
    }

    pub async fn get(&self, key: &JourneyKey) -> Option<f64> {
        self.lengths.get(key).await
    }

    pub async fn insert(&self, key: JourneyKey, length_km: f64) {
        self.lengths.insert(key, length_km).await;
    }

    /// Drop a single entry.
    pub async fn invalidate(&self, key: &JourneyKey) {
        self.lengths.invalidate(key).await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.lengths.invalidate_all();
    }

    /// Approximate number of entries (for monitoring).
    ///
    /// Moka updates this lazily; call [`JourneyCache::sync`] first when an
    /// exact figure matters.
    pub fn entry_count(&self) -> u64 {
        self.lengths.entry_count()
    }

    /// Flush pending maintenance so `entry_count` is current.
    pub async fn sync(&self) {
        self.lengths.run_pending_tasks().await;
    }
}

impl std::fmt::Debug for JourneyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JourneyCache")
            .field("entries", &self.lengths.entry_count())
            .finish()
    }
}
