//! Response Cache
//!
//! Request-keyed store of successful results with a fixed freshness window.
//! Staleness is checked lazily on read; there is no sweeper and entries are
//! only ever overwritten by the next successful fetch for the same key.
//! Failures are never stored and never touch an existing entry.
//!
//! Concurrent misses on one key are coalesced: the first caller fetches while
//! the others wait on a per-key lock and re-check freshness afterwards.

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::FetchFailure;
use crate::metrics;
use crate::schemas::Item;
use crate::sources::FetchParams;

/// Default freshness window: one hour
pub const DEFAULT_FRESHNESS_WINDOW_MS: u64 = 3_600_000;

/// Cache key derived from the full request
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey(String);

impl CacheKey {
    /// Target name plus every parameter, percent-encoded, parameters in name
    /// order. Values are taken verbatim, so `range=3` and `range=03` differ.
    /// `FetchParams` holds one value per name (the last one given), so
    /// `a=1&a=2` and `a=2` map to the same key.
    pub fn from_request(target: &str, params: &FetchParams) -> Self {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("target", target);
        for (name, value) in params.iter() {
            serializer.append_pair(name, value);
        }
        Self(serializer.finish())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Time source for freshness checks
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A stored result
#[derive(Debug, Clone)]
pub struct CacheEntry {
    items: Arc<Vec<Item>>,
    stored_at_ms: i64,
}

impl CacheEntry {
    pub fn items(&self) -> &Arc<Vec<Item>> {
        &self.items
    }
}

/// How a lookup was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Fresh entry found
    Hit,
    /// Fetched by this caller
    Miss,
    /// Another caller fetched it while this one waited
    Coalesced,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => metrics::CACHE_HIT,
            CacheStatus::Miss => metrics::CACHE_MISS,
            CacheStatus::Coalesced => metrics::CACHE_COALESCED,
        }
    }
}

pub struct ResponseCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    in_flight: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
    window_ms: i64,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    /// Creates a cache on the wall clock
    pub fn new(window: Duration) -> Self {
        Self::with_clock(window, Arc::new(SystemClock))
    }

    pub fn with_clock(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            window_ms: window.as_millis() as i64,
            clock,
        }
    }

    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Stored entry for `key`, fresh or not
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `items` under `key`, replacing any previous entry
    pub fn put(&self, key: CacheKey, items: Vec<Item>, now: i64) -> Arc<Vec<Item>> {
        let items = Arc::new(items);
        let entry = CacheEntry {
            items: items.clone(),
            stored_at_ms: now,
        };
        self.entries.write().insert(key, entry);
        items
    }

    /// An entry is fresh while its age does not exceed the window
    pub fn is_fresh(&self, entry: &CacheEntry, now: i64) -> bool {
        now.saturating_sub(entry.stored_at_ms) <= self.window_ms
    }

    /// Items for `key` if a fresh entry exists
    pub fn fresh(&self, key: &CacheKey) -> Option<Arc<Vec<Item>>> {
        let now = self.now();
        self.get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.items)
    }

    /// Serves a fresh entry, or runs `fetch` and stores its result.
    ///
    /// A failed fetch is returned as-is and leaves the store untouched.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        fetch: F,
    ) -> Result<(Arc<Vec<Item>>, CacheStatus), FetchFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Item>, FetchFailure>>,
    {
        if let Some(items) = self.fresh(key) {
            return Ok(self.served(key, items, CacheStatus::Hit));
        }

        let _flight = self.enter_flight(key).await;

        if let Some(items) = self.fresh(key) {
            return Ok(self.served(key, items, CacheStatus::Coalesced));
        }

        metrics::record_cache_lookup(CacheStatus::Miss.as_str());
        debug!(key = %key, "Cache miss");

        let items = fetch().await?;
        let stored = self.put(key.clone(), items, self.now());
        Ok((stored, CacheStatus::Miss))
    }

    /// Runs `fetch` regardless of freshness and stores the result on success.
    ///
    /// On failure the previous entry, fresh or stale, stays as it was.
    pub async fn refresh<F, Fut>(&self, key: &CacheKey, fetch: F) -> Result<Arc<Vec<Item>>, FetchFailure>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Item>, FetchFailure>>,
    {
        let _flight = self.enter_flight(key).await;

        debug!(key = %key, "Forced refresh");
        let items = fetch().await?;
        Ok(self.put(key.clone(), items, self.now()))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn served(
        &self,
        key: &CacheKey,
        items: Arc<Vec<Item>>,
        status: CacheStatus,
    ) -> (Arc<Vec<Item>>, CacheStatus) {
        metrics::record_cache_lookup(status.as_str());
        debug!(key = %key, status = status.as_str(), "Served from cache");
        (items, status)
    }

    /// Waits for exclusive use of `key`. The returned flight releases it on
    /// drop, whether the fetch succeeded, failed or was cancelled.
    async fn enter_flight<'a>(&'a self, key: &'a CacheKey) -> Flight<'a> {
        let lock = self
            .in_flight
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let mut flight = Flight {
            in_flight: &self.in_flight,
            key,
            lock,
            guard: None,
        };
        flight.guard = Some(flight.lock.clone().lock_owned().await);
        flight
    }
}

/// Per-key lock held for one fetch
struct Flight<'a> {
    in_flight: &'a Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
    key: &'a CacheKey,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        self.guard.take();

        // Clones are only handed out under this lock, so the count is stable
        let mut in_flight = self.in_flight.lock();
        if Arc::strong_count(&self.lock) == 2 {
            in_flight.remove(self.key);
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_FRESHNESS_WINDOW_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const WINDOW: Duration = Duration::from_millis(DEFAULT_FRESHNESS_WINDOW_MS);

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter().map(|id| Item::new(*id, *id, format!("/{}", id))).collect()
    }

    fn cache_at(start: i64) -> (ResponseCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start));
        (ResponseCache::with_clock(WINDOW, clock.clone()), clock)
    }

    #[test]
    fn test_cache_key_includes_params() {
        let plain = CacheKey::from_request("hackernews", &FetchParams::new());
        let ranged = CacheKey::from_request("hackernews", &FetchParams::new().with("range", "3"));
        let other = CacheKey::from_request("hackernews", &FetchParams::new().with("range", "03"));

        assert_eq!(plain.as_str(), "target=hackernews");
        assert_eq!(ranged.as_str(), "target=hackernews&range=3");
        assert_ne!(ranged, other);
    }

    #[test]
    fn test_cache_key_is_order_independent() {
        let a: FetchParams = vec![("b", "2"), ("a", "1")].into_iter().collect();
        let b: FetchParams = vec![("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(CacheKey::from_request("x", &a), CacheKey::from_request("x", &b));
    }

    #[test]
    fn test_freshness_boundary() {
        let (cache, _clock) = cache_at(0);
        let key = CacheKey::from_request("weibo", &FetchParams::new());
        cache.put(key.clone(), items(&["a"]), 1_000);

        let entry = cache.get(&key).unwrap();
        assert!(cache.is_fresh(&entry, 1_000 + DEFAULT_FRESHNESS_WINDOW_MS as i64));
        assert!(!cache.is_fresh(&entry, 1_000 + DEFAULT_FRESHNESS_WINDOW_MS as i64 + 1));
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let (cache, _clock) = cache_at(0);
        let key = CacheKey::from_request("weibo", &FetchParams::new());
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..2 {
            let (list, _) = cache
                .get_or_fetch(&key, move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(items(&["a", "b"]))
                })
                .await
                .unwrap();
            assert_eq!(list.len(), 2);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched_in_place() {
        let (cache, clock) = cache_at(0);
        let key = CacheKey::from_request("weibo", &FetchParams::new());

        cache.get_or_fetch(&key, || async { Ok(items(&["old"])) }).await.unwrap();
        clock.advance(WINDOW + Duration::from_millis(1));

        let (list, status) = cache
            .get_or_fetch(&key, || async { Ok(items(&["new"])) })
            .await
            .unwrap();

        assert_eq!(status, CacheStatus::Miss);
        assert_eq!(list[0].id, "new");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_stale_entry_untouched() {
        let (cache, clock) = cache_at(0);
        let key = CacheKey::from_request("weibo", &FetchParams::new());
        cache.put(key.clone(), items(&["kept"]), 0);
        clock.set(2 * DEFAULT_FRESHNESS_WINDOW_MS as i64);

        let err = cache
            .get_or_fetch(&key, || async { Err(FetchFailure::Unexpected("boom".to_string())) })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let entry = cache.get(&key).unwrap();
        assert_eq!(entry.items()[0].id, "kept");
        assert!(!cache.is_fresh(&entry, cache.now()));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_fresh_entry() {
        let (cache, _clock) = cache_at(0);
        let key = CacheKey::from_request("weibo", &FetchParams::new());
        cache.put(key.clone(), items(&["good"]), 0);

        let result = cache
            .refresh(&key, || async { Err(FetchFailure::Unexpected("outage".to_string())) })
            .await;
        assert!(result.is_err());

        assert_eq!(cache.fresh(&key).unwrap()[0].id, "good");
    }

    #[tokio::test]
    async fn test_flight_locks_are_released() {
        let (cache, _clock) = cache_at(0);

        for i in 0..100 {
            let key = CacheKey::from_request("weibo", &FetchParams::new().with("x", i.to_string()));
            let result = cache
                .get_or_fetch(&key, || async { Err(FetchFailure::Unexpected("down".to_string())) })
                .await;
            assert!(result.is_err());
        }
        assert!(cache.is_empty());
        assert!(cache.in_flight.lock().is_empty());

        let key = CacheKey::from_request("weibo", &FetchParams::new());
        cache.get_or_fetch(&key, || async { Ok(items(&["a"])) }).await.unwrap();
        cache.refresh(&key, || async { Ok(items(&["b"])) }).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_are_coalesced() {
        let (cache, _clock) = cache_at(0);
        let key = CacheKey::from_request("zhihu", &FetchParams::new());
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let fetch = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(items(&["a"]))
        };

        let (first, second) = tokio::join!(cache.get_or_fetch(&key, fetch), cache.get_or_fetch(&key, fetch));

        let statuses = [first.unwrap().1, second.unwrap().1];
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(statuses.contains(&CacheStatus::Miss));
        assert!(statuses.contains(&CacheStatus::Coalesced));
        assert!(cache.in_flight.lock().is_empty());
    }
}
