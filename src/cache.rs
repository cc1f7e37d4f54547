//! URI match caching
//!
//! Remembers which table pattern a URI path matched (and the captured parameters) with
//! LRU eviction, so repeated deep links and restoration don't rescan every pattern.
//! Routes themselves are never cached: each parse constructs a fresh instance.

use crate::params::RouteParams;
use crate::trace_log;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Outcome of matching one URI path against the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CachedMatch {
    /// Index of the matching table entry
    pub(crate) entry: usize,
    pub(crate) params: RouteParams,
}

/// Cache performance statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// LRU of URI path -> match outcome (`None` = no pattern matched)
///
/// A capacity of zero disables caching.
#[derive(Debug)]
pub(crate) struct ParseCache {
    entries: Option<LruCache<String, Option<CachedMatch>>>,
    stats: CacheStats,
}

impl ParseCache {
    pub(crate) const DEFAULT_CAPACITY: usize = 256;

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: CacheStats::default(),
        }
    }

    pub(crate) fn get(&mut self, path: &str) -> Option<Option<CachedMatch>> {
        let entries = self.entries.as_mut()?;
        match entries.get(path) {
            Some(cached) => {
                self.stats.hits += 1;
                trace_log!("Parse cache hit for '{}'", path);
                Some(cached.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    pub(crate) fn put(&mut self, path: String, outcome: Option<CachedMatch>) {
        if let Some(entries) = self.entries.as_mut() {
            entries.put(path, outcome);
        }
    }

    pub(crate) fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            if !entries.is_empty() {
                trace_log!("Clearing parse cache");
                entries.clear();
                self.stats.invalidations += 1;
            }
        }
    }

    /// Change capacity, dropping every cached entry
    pub(crate) fn resize(&mut self, capacity: usize) {
        self.entries = NonZeroUsize::new(capacity).map(LruCache::new);
    }

    pub(crate) fn stats(&self) -> CacheStats {
        self.stats
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.cap().get())
    }
}

impl Default for ParseCache {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(entry: usize) -> Option<CachedMatch> {
        Some(CachedMatch {
            entry,
            params: RouteParams::new(),
        })
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let mut cache = ParseCache::default();
        assert_eq!(cache.get("/users/1"), None);
        cache.put("/users/1".to_string(), matched(2));

        assert_eq!(cache.get("/users/1"), Some(matched(2)));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
        assert!((cache.stats().hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_negative_outcomes_are_cached() {
        let mut cache = ParseCache::default();
        cache.put("/nowhere".to_string(), None);
        assert_eq!(cache.get("/nowhere"), Some(None));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = ParseCache::with_capacity(2);
        cache.put("/a".to_string(), matched(0));
        cache.put("/b".to_string(), matched(1));
        cache.get("/a");
        cache.put("/c".to_string(), matched(2));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("/b"), None);
        assert!(cache.get("/a").is_some());
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = ParseCache::with_capacity(0);
        cache.put("/a".to_string(), matched(0));
        assert_eq!(cache.get("/a"), None);
        assert_eq!(cache.capacity(), 0);
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_clear_counts_invalidation() {
        let mut cache = ParseCache::default();
        cache.put("/a".to_string(), matched(0));
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().invalidations, 1);

        cache.resize(8);
        assert_eq!(cache.capacity(), 8);
    }
}
