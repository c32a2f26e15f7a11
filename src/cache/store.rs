//! Cache storage: the entry record, the `CacheStore` trait and an in-memory store

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::key::{CacheKey, RequestMode};

/// Errors surfaced by a cache store
///
/// Corrupt records are never reported here; stores treat them as absent.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem read, write or rename failed
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be serialized
    #[error("failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Temporary file could not be moved into place
    #[error("failed to persist cache entry: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// A cached response as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Derived key this entry is stored under
    pub key: CacheKey,
    /// Mode of the request that produced the payload
    pub mode: RequestMode,
    /// Normalized request parameter, for listings
    pub label: String,
    /// When the payload was stored
    pub stored_at: DateTime<Utc>,
    /// Seconds after `stored_at` during which the entry is fresh
    pub ttl_seconds: u64,
    /// The fetched result
    pub payload: serde_json::Value,
}

/// Per-entry line in the statistics listing
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySummary {
    pub key: CacheKey,
    pub mode: RequestMode,
    pub label: String,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
    /// Size of the serialized record in bytes
    pub size: u64,
}

/// Aggregate statistics over every parseable record, stale or not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStats {
    pub entry_count: usize,
    pub total_bytes: u64,
    pub oldest_stored_at: Option<DateTime<Utc>>,
    pub newest_stored_at: Option<DateTime<Utc>>,
    /// Entries sorted newest first
    pub entries: Vec<EntrySummary>,
}

impl StoreStats {
    /// Builds statistics from a set of summaries
    pub fn from_summaries(mut entries: Vec<EntrySummary>) -> Self {
        entries.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        Self {
            entry_count: entries.len(),
            total_bytes: entries.iter().map(|e| e.size).sum(),
            oldest_stored_at: entries.iter().map(|e| e.stored_at).min(),
            newest_stored_at: entries.iter().map(|e| e.stored_at).max(),
            entries,
        }
    }
}

/// Key-value storage for cache entries
///
/// Implementations must treat unparseable records as absent. Every other
/// failure is returned so the caller decides whether to swallow it.
pub trait CacheStore: Send + Sync {
    /// Reads the entry stored under `key`, if any
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Stores `entry` under its key, replacing any previous entry
    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Removes every entry, returning how many were confirmed removed
    fn clear_all(&self) -> Result<usize, CacheError>;

    /// Aggregates statistics over all stored entries
    fn stats(&self) -> Result<StoreStats, CacheError>;

    /// Where entries live, if they live on disk
    fn location(&self) -> Option<&Path> {
        None
    }

    fn name(&self) -> &'static str;
}

/// Store that keeps serialized entries in memory
///
/// Entries are held as JSON bytes so sizes and corruption behave like the
/// file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the raw bytes stored under `key`
    pub fn insert_raw(&self, key: &CacheKey, bytes: Vec<u8>) {
        self.write_records().insert(key.as_str().to_string(), bytes);
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_records(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let parsed = match self.read_records().get(key.as_str()) {
            Some(bytes) => serde_json::from_slice::<CacheEntry>(bytes).ok(),
            None => return Ok(None),
        };
        if parsed.is_none() {
            self.write_records().remove(key.as_str());
        }
        Ok(parsed)
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec_pretty(entry)?;
        self.insert_raw(&entry.key, bytes);
        Ok(())
    }

    fn clear_all(&self) -> Result<usize, CacheError> {
        let mut records = self.write_records();
        let count = records.len();
        records.clear();
        Ok(count)
    }

    fn stats(&self) -> Result<StoreStats, CacheError> {
        let summaries = self
            .read_records()
            .values()
            .filter_map(|bytes| {
                let entry: CacheEntry = serde_json::from_slice(bytes).ok()?;
                Some(EntrySummary {
                    key: entry.key,
                    mode: entry.mode,
                    label: entry.label,
                    stored_at: entry.stored_at,
                    ttl_seconds: entry.ttl_seconds,
                    size: bytes.len() as u64,
                })
            })
            .collect();
        Ok(StoreStats::from_summaries(summaries))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
