//! Cache manager: the façade used by the fetch workflow
//!
//! Derives keys, consults the store and the freshness policy, and decides
//! once, here, that cache failures degrade to misses instead of errors.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::file::FileStore;
use super::key::{CacheKey, CacheRequest};
use super::policy;
use super::report::CacheReport;
use super::store::{CacheEntry, CacheStore};

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<T> {
    /// A fresh entry was found
    Hit {
        /// The cached data
        payload: T,
        /// When the data was originally stored
        cached_at: DateTime<Utc>,
    },
    /// Nothing usable is cached; fetch and store under `key`
    Miss { key: CacheKey },
}

impl<T> CacheLookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit { .. })
    }
}

/// Reads and writes cached responses through a `CacheStore`
pub struct CacheManager {
    store: Box<dyn CacheStore>,
}

impl CacheManager {
    /// Creates a manager over any store
    pub fn new(store: Box<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Creates a manager backed by JSON files in `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(FileStore::new(cache_dir)))
    }

    /// Returns the key a request is cached under
    pub fn key_for(request: &CacheRequest) -> CacheKey {
        CacheKey::derive(request)
    }

    /// Looks up a fresh cached payload for `request`
    pub fn lookup<T: DeserializeOwned>(&self, request: &CacheRequest) -> CacheLookup<T> {
        self.lookup_at(request, Utc::now())
    }

    /// Looks up `request`, judging freshness at `now`
    ///
    /// Stale entries are left on disk; the next store overwrites them.
    pub fn lookup_at<T: DeserializeOwned>(
        &self,
        request: &CacheRequest,
        now: DateTime<Utc>,
    ) -> CacheLookup<T> {
        let key = Self::key_for(request);

        let entry = match self.store.get(&key) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(%key, mode = %request.mode, "cache miss");
                return CacheLookup::Miss { key };
            }
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as miss");
                return CacheLookup::Miss { key };
            }
        };

        if !policy::is_fresh(&entry, now) {
            debug!(%key, stored_at = %entry.stored_at, "cache entry expired");
            return CacheLookup::Miss { key };
        }

        match serde_json::from_value::<T>(entry.payload) {
            Ok(payload) => {
                debug!(%key, mode = %request.mode, "cache hit");
                CacheLookup::Hit {
                    payload,
                    cached_at: entry.stored_at,
                }
            }
            Err(e) => {
                debug!(%key, error = %e, "cached payload has unexpected shape");
                CacheLookup::Miss { key }
            }
        }
    }

    /// Stores `payload` under `key` with the TTL for the request's mode
    ///
    /// Failures are logged and otherwise ignored.
    pub fn store<T: Serialize>(&self, key: &CacheKey, request: &CacheRequest, payload: &T) {
        self.store_at(key, request, payload, Utc::now());
    }

    /// Stores `payload` as if it had been fetched at `stored_at`
    pub fn store_at<T: Serialize>(
        &self,
        key: &CacheKey,
        request: &CacheRequest,
        payload: &T,
        stored_at: DateTime<Utc>,
    ) {
        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(%key, error = %e, "could not serialize payload for cache");
                return;
            }
        };

        let entry = CacheEntry {
            key: key.clone(),
            mode: request.mode,
            label: request.normalized_param(),
            stored_at,
            ttl_seconds: policy::ttl_for(request.mode),
            payload,
        };

        match self.store.put(&entry) {
            Ok(()) => debug!(%key, ttl = entry.ttl_seconds, "cached response"),
            Err(e) => warn!(%key, error = %e, "could not save to cache"),
        }
    }

    /// Removes every cached entry, returning how many were removed
    pub fn clear(&self) -> usize {
        match self.store.clear_all() {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "could not clear cache");
                0
            }
        }
    }

    /// Collects statistics for display
    pub fn report(&self) -> CacheReport {
        self.report_at(Utc::now())
    }

    /// Collects statistics, measuring ages and expiry against `now`
    pub fn report_at(&self, now: DateTime<Utc>) -> CacheReport {
        let location = self.location();
        match self.store.stats() {
            Ok(stats) => CacheReport::from_stats(stats, location, now),
            Err(e) => {
                warn!(error = %e, "could not collect cache statistics");
                CacheReport::empty(location, now)
            }
        }
    }

    /// Cache directory, when backed by files
    pub fn location(&self) -> Option<PathBuf> {
        self.store.location().map(|path| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::key::RequestMode;
    use crate::cache::store::{CacheError, MemoryStore, StoreStats};
    use chrono::Duration;
    use serde::{Deserialize, Serialize};
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestPayload {
        query: String,
        count: usize,
    }

    fn payload(query: &str, count: usize) -> TestPayload {
        TestPayload {
            query: query.to_string(),
            count,
        }
    }

    fn memory_manager() -> CacheManager {
        CacheManager::new(Box::new(MemoryStore::new()))
    }

    fn create_test_cache() -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::with_dir(temp_dir.path());
        (cache, temp_dir)
    }

    /// Store whose every operation fails with an I/O error
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, _: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
            Err(std::io::Error::other("disk on fire").into())
        }
        fn put(&self, _: &CacheEntry) -> Result<(), CacheError> {
            Err(std::io::Error::other("disk full").into())
        }
        fn clear_all(&self) -> Result<usize, CacheError> {
            Err(std::io::Error::other("permission denied").into())
        }
        fn stats(&self) -> Result<StoreStats, CacheError> {
            Err(std::io::Error::other("permission denied").into())
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_lookup_on_empty_cache_is_miss_with_derived_key() {
        let cache = memory_manager();
        let request = CacheRequest::new(RequestMode::Search, "OpenAI");

        let result: CacheLookup<TestPayload> = cache.lookup(&request);

        assert_eq!(
            result,
            CacheLookup::Miss {
                key: CacheManager::key_for(&request)
            }
        );
    }

    #[test]
    fn test_search_hit_within_an_hour() {
        let cache = memory_manager();
        let request = CacheRequest::new(RequestMode::Search, "OpenAI");
        let key = CacheManager::key_for(&request);
        let data = payload("OpenAI", 3);
        let stored_at = Utc::now();

        cache.store_at(&key, &request, &data, stored_at);
        let result = cache.lookup_at::<TestPayload>(&request, stored_at + Duration::minutes(59));

        assert_eq!(
            result,
            CacheLookup::Hit {
                payload: data,
                cached_at: stored_at
            }
        );
    }

    #[test]
    fn test_equivalent_request_hits_same_entry() {
        let cache = memory_manager();
        let request = CacheRequest::new(RequestMode::User, "Alice, bob");
        cache.store(&CacheManager::key_for(&request), &request, &payload("x", 1));

        let same = CacheRequest::new(RequestMode::User, "@BOB,alice");
        assert!(cache.lookup::<TestPayload>(&same).is_hit());
    }

    #[test]
    fn test_search_expires_after_an_hour() {
        let cache = memory_manager();
        let request = CacheRequest::new(RequestMode::Search, "OpenAI");
        let key = CacheManager::key_for(&request);
        let stored_at = Utc::now();

        cache.store_at(&key, &request, &payload("OpenAI", 1), stored_at);

        let result = cache.lookup_at::<TestPayload>(&request, stored_at + Duration::hours(1));
        assert_eq!(result, CacheLookup::Miss { key });
    }

    #[test]
    fn test_user_entry_backdated_25_hours_is_miss() {
        let (cache, _temp_dir) = create_test_cache();
        let request = CacheRequest::new(RequestMode::User, "elonmusk");
        let key = CacheManager::key_for(&request);

        cache.store_at(
            &key,
            &request,
            &payload("elonmusk", 20),
            Utc::now() - Duration::hours(25),
        );

        let result: CacheLookup<TestPayload> = cache.lookup(&request);
        assert_eq!(result, CacheLookup::Miss { key });
    }

    #[test]
    fn test_stale_entry_is_left_in_place() {
        let (cache, temp_dir) = create_test_cache();
        let request = CacheRequest::new(RequestMode::User, "elonmusk");
        let key = CacheManager::key_for(&request);
        cache.store_at(&key, &request, &payload("old", 1), Utc::now() - Duration::days(2));

        assert!(!cache.lookup::<TestPayload>(&request).is_hit());
        assert!(temp_dir.path().join(format!("{}.json", key)).exists());
        assert_eq!(cache.report().entry_count, 1);
    }

    #[test]
    fn test_store_overwrites_stale_entry() {
        let (cache, _temp_dir) = create_test_cache();
        let request = CacheRequest::new(RequestMode::Url, "https://x.com/a/status/1234567890123");
        let key = CacheManager::key_for(&request);
        cache.store_at(&key, &request, &payload("old", 1), Utc::now() - Duration::days(2));
        cache.store(&key, &request, &payload("new", 2));

        match cache.lookup::<TestPayload>(&request) {
            CacheLookup::Hit { payload, .. } => assert_eq!(payload.query, "new"),
            miss => panic!("expected hit, got {:?}", miss),
        }
    }

    #[test]
    fn test_store_uses_mode_ttl() {
        let (cache, temp_dir) = create_test_cache();
        let request = CacheRequest::new(RequestMode::User, "elonmusk");
        let key = CacheManager::key_for(&request);
        cache.store(&key, &request, &payload("elonmusk", 1));

        let content = fs::read_to_string(temp_dir.path().join(format!("{}.json", key))).unwrap();
        let entry: CacheEntry = serde_json::from_str(&content).unwrap();
        assert_eq!(entry.ttl_seconds, 86400);
        assert_eq!(entry.mode, RequestMode::User);
        assert_eq!(entry.label, "elonmusk");
    }

    #[test]
    fn test_corrupt_file_is_miss() {
        let (cache, temp_dir) = create_test_cache();
        let request = CacheRequest::new(RequestMode::Search, "rust");
        let key = CacheManager::key_for(&request);
        fs::write(temp_dir.path().join(format!("{}.json", key)), [0xff, 0x00, 0x7b]).unwrap();

        let result: CacheLookup<TestPayload> = cache.lookup(&request);
        assert_eq!(result, CacheLookup::Miss { key });
    }

    #[test]
    fn test_payload_of_wrong_shape_is_miss() {
        let cache = memory_manager();
        let request = CacheRequest::new(RequestMode::Search, "rust");
        cache.store(&CacheManager::key_for(&request), &request, &vec![1, 2, 3]);

        assert!(!cache.lookup::<TestPayload>(&request).is_hit());
    }

    #[test]
    fn test_last_writer_wins() {
        let cache = memory_manager();
        let request = CacheRequest::new(RequestMode::Search, "rust");
        let key = CacheManager::key_for(&request);
        cache.store(&key, &request, &payload("first", 1));
        cache.store(&key, &request, &payload("second", 2));

        match cache.lookup::<TestPayload>(&request) {
            CacheLookup::Hit { payload, .. } => assert_eq!(payload, self::payload("second", 2)),
            miss => panic!("expected hit, got {:?}", miss),
        }
    }

    #[test]
    fn test_clear_removes_three_entries() {
        let (cache, _temp_dir) = create_test_cache();
        let requests = [
            CacheRequest::new(RequestMode::Search, "OpenAI"),
            CacheRequest::new(RequestMode::User, "elonmusk"),
            CacheRequest::new(RequestMode::Url, "1234567890123"),
        ];
        for request in &requests {
            cache.store(&CacheManager::key_for(request), request, &payload("x", 1));
        }
        assert_eq!(cache.report().entry_count, 3);

        assert_eq!(cache.clear(), 3);
        assert_eq!(cache.report().entry_count, 0);
    }

    #[test]
    fn test_report_counts_expired() {
        let cache = memory_manager();
        let now = Utc::now();
        let fresh = CacheRequest::new(RequestMode::Search, "fresh");
        let stale = CacheRequest::new(RequestMode::Search, "stale");
        cache.store_at(&CacheManager::key_for(&fresh), &fresh, &payload("a", 1), now);
        cache.store_at(
            &CacheManager::key_for(&stale),
            &stale,
            &payload("b", 1),
            now - Duration::hours(2),
        );

        let report = cache.report_at(now);
        assert_eq!(report.entry_count, 2);
        assert_eq!(report.expired_count, 1);
        assert_eq!(report.newest_stored_at, Some(now));
        assert!(report.location.is_none());
    }

    #[test]
    fn test_report_location_is_cache_dir() {
        let (cache, temp_dir) = create_test_cache();
        assert_eq!(cache.report().location, Some(temp_dir.path().to_path_buf()));
    }

    #[test]
    fn test_store_failures_are_swallowed() {
        let cache = CacheManager::new(Box::new(BrokenStore));
        let request = CacheRequest::new(RequestMode::Search, "rust");
        let key = CacheManager::key_for(&request);

        cache.store(&key, &request, &payload("rust", 1));
        assert_eq!(cache.lookup::<TestPayload>(&request), CacheLookup::Miss { key });
        assert_eq!(cache.clear(), 0);
        assert_eq!(cache.report().entry_count, 0);
    }

    #[test]
    fn test_unwritable_cache_dir_does_not_fail() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "a file where the cache dir should be").unwrap();
        let cache = CacheManager::with_dir(blocker.join("cache"));
        let request = CacheRequest::new(RequestMode::Search, "rust");

        cache.store(&CacheManager::key_for(&request), &request, &payload("rust", 1));
        assert!(!cache.lookup::<TestPayload>(&request).is_hit());
    }
}
