use std::time::{Duration, Instant};

use log::debug;
use moka::sync::Cache;

use crate::models::{DeploymentFrequency, Platform};

/// Upper bound on distinct requests kept in memory.
pub const DEFAULT_MAX_ENTRIES: u64 = 1024;

/// Everything that distinguishes one deployment frequency request from another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub platform: Platform,
    pub owner: String,
    pub project: String,
    pub branch: String,
    pub pipeline: String,
    pub number_of_days: u32,
    pub max_number_of_items: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: DeploymentFrequency,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Result cache with a fixed time-to-live, bounded by entry count.
///
/// Expiry is tracked per entry rather than by moka, so an expired result
/// reads as a miss through [`ResultCache::get`] yet stays reachable through
/// [`ResultCache::get_stale`] until it is replaced or evicted for capacity.
pub struct ResultCache {
    ttl: Duration,
    entries: Cache<CacheKey, CacheEntry>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::<CacheKey, CacheEntry>::builder()
            .max_capacity(max_entries)
            .eviction_listener(|k, _v, cause| {
                debug!(
                    "Dropping cached result for {}/{} ({}): {cause:?}",
                    k.owner, k.project, k.pipeline
                );
            })
            .build();

        Self { ttl, entries }
    }

    pub fn get(&self, key: &CacheKey) -> Option<DeploymentFrequency> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_fresh(Instant::now()))
            .map(|entry| entry.result)
    }

    /// Last stored result for the key, fresh or not.
    pub fn get_stale(&self, key: &CacheKey) -> Option<DeploymentFrequency> {
        self.entries.get(key).map(|entry| entry.result)
    }

    pub fn put(&self, key: CacheKey, result: DeploymentFrequency) {
        let entry = CacheEntry {
            result,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.insert(key, entry);
    }

    #[cfg(test)]
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }
}
