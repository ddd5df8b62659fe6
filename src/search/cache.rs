//! LRU cache of search outcomes.
//!
//! Keys include the index generation, so a publish implicitly invalidates
//! every earlier entry. All operations are non-blocking (try-lock pattern):
//! a contended cache behaves like a miss.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use super::engine::{SearchOptions, SearchOutcome};

/// Default cache size for query results (number of queries)
pub const DEFAULT_QUERY_CACHE_SIZE: usize = 128;

/// Cache statistics for monitoring and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

pub struct QueryCache {
    entries: Mutex<LruCache<u64, SearchOutcome>>,
    stats: Mutex<CacheStats>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_CACHE_SIZE)
    }
}

impl QueryCache {
    /// A zero capacity is treated as one entry
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            stats: Mutex::new(CacheStats::default()),
        }
    }

    fn key(generation: u64, query: &str, options: &SearchOptions) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        generation.hash(&mut hasher);
        query.hash(&mut hasher);
        options.keyword_mode.hash(&mut hasher);
        options.limit.hash(&mut hasher);
        options.locale.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns None if not cached or the cache is locked.
    pub fn get(&self, generation: u64, query: &str, options: &SearchOptions) -> Option<SearchOutcome> {
        let key = Self::key(generation, query, options);
        let mut entries = self.entries.try_lock().ok()?;
        let mut stats = self.stats.try_lock().ok()?;

        if let Some(outcome) = entries.get(&key) {
            stats.hits += 1;
            Some(outcome.clone())
        } else {
            stats.misses += 1;
            None
        }
    }

    /// Silently skipped if the cache is locked.
    pub fn put(&self, generation: u64, query: &str, options: &SearchOptions, outcome: SearchOutcome) {
        let key = Self::key(generation, query, options);
        if let Ok(mut entries) = self.entries.try_lock() {
            entries.put(key, outcome);
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats.try_lock().map(|s| *s).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.try_lock() {
            entries.clear();
        }
        if let Ok(mut stats) = self.stats.try_lock() {
            *stats = CacheStats::default();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.try_lock().map(|c| c.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
