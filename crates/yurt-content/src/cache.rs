// cache.rs — Short-TTL memoization of discovery and content reads.
//
// Every editor page load triggers the same handful of store reads, and the
// backing host rate-limits aggressively. A 60-second cache absorbs the
// burst while staying short enough that out-of-band commits show up within
// a minute. Writes invalidate eagerly, so an editor always sees their own
// save immediately.
//
// Keys are flat strings: `repo/branch` for a discovery listing,
// `repo/slug/branch` for one content type's records. Prefix invalidation
// clears everything under a repo in one call.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use yurt_gitstore::RepoStore;

use crate::discovery::{self, DiscoveredConfig};
use crate::error::ContentError;
use crate::fetch;
use crate::record::Content;

/// How long a cached value stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Time source, swappable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Cache counters for the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// A TTL cache over cloneable values.
pub struct ContentCache<T> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, Entry<T>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<T: Clone> ContentCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A fresh value for `key`, or `None` (expired entries are evicted on
    /// the way out).
    pub fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let fresh = match entries.get(key) {
            Some(entry) if self.clock.now().duration_since(entry.stored_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        };
        match &fresh {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        fresh
    }

    pub fn put(&self, key: &str, value: T) {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(
            key.to_string(),
            Entry {
                value,
                stored_at: self.clock.now(),
            },
        );
    }

    /// A fresh value for `key`, computing and caching it on a miss. The
    /// lock is never held across the fill, so concurrent misses may race;
    /// the last writer wins, which is fine for idempotent reads.
    pub async fn get_or_try_insert<F, Fut, E>(&self, key: &str, fill: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        let value = fill().await?;
        self.put(key, value.clone());
        Ok(value)
    }

    pub fn invalidate(&self, key: &str) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .remove(key);
    }

    /// Drop every entry whose key starts with `prefix`. A write to a branch
    /// invalidates `repo/` wholesale rather than chasing individual keys.
    pub fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub fn stats(&self) -> CacheStat {
        CacheStat {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.lock().expect("cache lock poisoned").len(),
        }
    }

    /// Every live key with its age, for debug surfaces.
    pub fn ages(&self) -> Vec<(String, Duration)> {
        let now = self.clock.now();
        let entries = self.entries.lock().expect("cache lock poisoned");
        let mut listing: Vec<_> = entries
            .iter()
            .map(|(key, entry)| (key.clone(), now.duration_since(entry.stored_at)))
            .collect();
        listing.sort();
        listing
    }
}

impl<T: Clone> Default for ContentCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache key for a branch's discovery listing.
pub fn discovery_key(repo: &str, branch: &str) -> String {
    format!("{repo}/{branch}")
}

/// Cache key for one content type's records on a branch.
pub fn content_key(repo: &str, slug: &str, branch: &str) -> String {
    format!("{repo}/{slug}/{branch}")
}

/// Warm both caches for a branch in one pass: discover every content type,
/// then fetch each one's records. Returns how many types were prefetched.
pub async fn prefetch<S: RepoStore + ?Sized>(
    store: &S,
    repo: &str,
    branch: Option<&str>,
    configs: &ContentCache<Vec<DiscoveredConfig>>,
    content: &ContentCache<Content>,
) -> Result<usize, ContentError> {
    let branch_name = match branch {
        Some(b) => b.to_string(),
        None => store.default_branch().await?,
    };

    let discovered = discovery::discover(store, Some(&branch_name)).await?;
    configs.put(&discovery_key(repo, &branch_name), discovered.clone());

    let mut warmed = 0;
    for entry in &discovered {
        match fetch::fetch_content(store, &entry.config, &entry.path, Some(&branch_name)).await {
            Ok(records) => {
                content.put(&content_key(repo, &entry.slug, &branch_name), records);
                warmed += 1;
            }
            Err(e) => {
                tracing::warn!(slug = %entry.slug, error = %e, "prefetch skipped content type");
            }
        }
    }
    tracing::debug!(repo, branch = %branch_name, warmed, "prefetched content caches");
    Ok(warmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ManualClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let clock = Arc::new(ManualClock::new());
        let cache: ContentCache<i32> =
            ContentCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.put("repo/main", 1);
        assert_eq!(cache.get("repo/main"), Some(1));

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get("repo/main"), Some(1));

        clock.advance(Duration::from_secs(2));
        assert_eq!(cache.get("repo/main"), None);
        // The expired entry was evicted, not just hidden.
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn prefix_invalidation_clears_a_repo() {
        let cache: ContentCache<i32> = ContentCache::default();
        cache.put(&content_key("acme/site", "posts", "main"), 1);
        cache.put(&content_key("acme/site", "posts", "preview-2026-08-29"), 2);
        cache.put(&content_key("other/repo", "posts", "main"), 3);

        cache.invalidate_prefix("acme/site/");
        assert_eq!(cache.get(&content_key("acme/site", "posts", "main")), None);
        assert_eq!(cache.get(&content_key("other/repo", "posts", "main")), Some(3));
    }

    #[test]
    fn stats_count_hits_and_misses() {
        let cache: ContentCache<i32> = ContentCache::default();
        cache.put("k", 1);
        cache.get("k");
        cache.get("k");
        cache.get("absent");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn get_or_try_insert_fills_once() {
        let cache: ContentCache<i32> = ContentCache::default();

        let filled: Result<i32, ContentError> =
            cache.get_or_try_insert("k", || async { Ok(7) }).await;
        assert_eq!(filled.unwrap(), 7);

        // Second lookup is served from the cache, not the fill.
        let cached: Result<i32, ContentError> = cache
            .get_or_try_insert("k", || async { panic!("should not refill") })
            .await;
        assert_eq!(cached.unwrap(), 7);
    }

    #[test]
    fn ages_lists_live_keys() {
        let clock = Arc::new(ManualClock::new());
        let cache: ContentCache<i32> =
            ContentCache::with_clock(Duration::from_secs(60), clock.clone());

        cache.put("a", 1);
        clock.advance(Duration::from_secs(5));
        cache.put("b", 2);
        clock.advance(Duration::from_secs(1));

        let ages = cache.ages();
        assert_eq!(ages.len(), 2);
        assert_eq!(ages[0].0, "a");
        assert_eq!(ages[0].1, Duration::from_secs(6));
        assert_eq!(ages[1].1, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn prefetch_warms_discovery_and_content() {
        use yurt_gitstore::MemoryStore;

        let store = MemoryStore::new();
        store.seed_file(
            "site.yurt.json",
            br#"{ "label": "Site Settings", "contentFile": "./settings.json", "fields": { "title": "text" } }"#,
        );
        store.seed_file("settings.json", b"{\"title\": \"Hi\"}\n");

        let configs = ContentCache::default();
        let content = ContentCache::default();
        let warmed = prefetch(&store, "acme/site", None, &configs, &content)
            .await
            .unwrap();

        assert_eq!(warmed, 1);
        assert!(configs.get(&discovery_key("acme/site", "main")).is_some());
        assert!(content
            .get(&content_key("acme/site", "site-settings", "main"))
            .is_some());
    }
}
