//! In-memory response cache with a freshness window.
//!
//! Entries younger than the TTL are served without touching the network.
//! Older entries are refreshed, but kept around so they can be served when
//! the refresh fails.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default freshness window
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A cached payload and the moment it was fetched
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub payload: V,
    pub fetched_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.duration_since(self.fetched_at) < ttl
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub fresh_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub stale_served: u64,
}

/// Key/value cache with TTL freshness and serve-stale on error
///
/// Without `max_entries` the cache grows for the lifetime of the process.
/// Concurrent misses on the same key each run their own fetch.
pub struct TtlCache<V> {
    ttl: Duration,
    max_entries: Option<usize>,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_served: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given freshness window
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: None,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_served: AtomicU64::new(0),
        }
    }

    /// Bound the number of entries; the oldest fetch is evicted first
    pub fn with_max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries.filter(|&max| max > 0);
        self
    }

    /// Build a cache from the `[catalog.cache]` configuration section
    pub fn from_config(config: &shared::config::CacheConfig) -> Self {
        Self::new(Duration::from_secs(config.ttl_seconds)).with_max_entries(config.max_entries)
    }

    /// Freshness window
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached payload for `key`, fetching it when missing or stale
    ///
    /// A fresh entry is returned without calling `fetch`. When `fetch` fails
    /// and an older entry exists, that entry is returned instead of the
    /// error.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        E: std::fmt::Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let cached = self.lookup(key);

        if let Some(entry) = &cached {
            if entry.is_fresh(self.ttl, Instant::now()) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = key, "Cache hit");
                return Ok(entry.payload.clone());
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = key, stale = cached.is_some(), "Cache miss");

        match fetch().await {
            Ok(payload) => {
                self.insert(key, payload.clone());
                Ok(payload)
            }
            Err(e) => match cached {
                Some(entry) => {
                    self.stale_served.fetch_add(1, Ordering::Relaxed);
                    warn!(key = key, error = %e, "Fetch failed, serving stale entry");
                    Ok(entry.payload)
                }
                None => Err(e),
            },
        }
    }

    /// Read an entry, fresh or stale, without fetching
    pub fn peek(&self, key: &str) -> Option<V> {
        self.lookup(key).map(|entry| entry.payload)
    }

    /// Store a payload as freshly fetched
    pub fn insert(&self, key: &str, payload: V) {
        let mut entries = self.lock();
        entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload,
                fetched_at: Instant::now(),
            },
        );

        if let Some(max) = self.max_entries {
            while entries.len() > max {
                let oldest = entries
                    .values()
                    .filter(|entry| entry.key != key)
                    .min_by_key(|entry| entry.fetched_at)
                    .map(|entry| entry.key.clone());

                match oldest {
                    Some(oldest) => {
                        debug!(key = %oldest, "Evicting oldest cache entry");
                        entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
    }

    /// Number of entries, fresh or stale
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let entries = self.lock();

        CacheStats {
            entries: entries.len(),
            fresh_entries: entries
                .values()
                .filter(|entry| entry.is_fresh(self.ttl, now))
                .count(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_served: self.stale_served.load(Ordering::Relaxed),
        }
    }

    fn lookup(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // A panic while holding the lock cannot leave a map half-updated
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_fetch<'a>(
        calls: &'a AtomicUsize,
        result: Result<&'static str, &'static str>,
    ) -> impl FnOnce() -> std::future::Ready<Result<String, String>> + 'a {
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result.map(str::to_string).map_err(str::to_string))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_entry_skips_fetch() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        let first = cache.get_or_fetch("latest", counting_fetch(&calls, Ok("v1"))).await;
        assert_eq!(first.unwrap(), "v1");

        tokio::time::advance(Duration::from_secs(299)).await;

        let second = cache.get_or_fetch("latest", counting_fetch(&calls, Ok("v2"))).await;
        assert_eq!(second.unwrap(), "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refreshed() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("latest", counting_fetch(&calls, Ok("v1"))).await.unwrap();
        tokio::time::advance(Duration::from_secs(300)).await;

        let refreshed = cache.get_or_fetch("latest", counting_fetch(&calls, Ok("v2"))).await;
        assert_eq!(refreshed.unwrap(), "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.peek("latest").as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_failure_without_entry_propagates() {
        let cache: TtlCache<String> = TtlCache::new(DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        let result = cache.get_or_fetch("missing", counting_fetch(&calls, Err("boom"))).await;
        assert_eq!(result.unwrap_err(), "boom");
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_stale_entry() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("popular", counting_fetch(&calls, Ok("old"))).await.unwrap();
        tokio::time::advance(Duration::from_secs(3600)).await;

        let result = cache.get_or_fetch("popular", counting_fetch(&calls, Err("down"))).await;
        assert_eq!(result.unwrap(), "old");
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stats = cache.stats();
        assert_eq!(stats.stale_served, 1);
        assert_eq!(stats.fresh_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_entries_evicts_oldest() {
        let cache = TtlCache::new(DEFAULT_TTL).with_max_entries(Some(2));

        cache.insert("a", 1);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("b", 2);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.peek("a"), None);
        assert_eq!(cache.peek("b"), Some(2));
        assert_eq!(cache.peek("c"), Some(3));
    }

    #[tokio::test]
    async fn test_stats_counts_hits_and_misses() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        cache.get_or_fetch("k", counting_fetch(&calls, Ok("v"))).await.unwrap();
        cache.get_or_fetch("k", counting_fetch(&calls, Ok("v"))).await.unwrap();
        cache.get_or_fetch("k", counting_fetch(&calls, Ok("v"))).await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.fresh_entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
