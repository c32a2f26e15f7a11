//! File-backed cache store
//!
//! Each entry is a pretty-printed JSON file named `<key>.json` inside the
//! cache directory. Writes go to a temporary file in the same directory
//! which is then renamed over the target, so readers see either the old
//! record or the complete new one.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::key::CacheKey;
use super::store::{CacheEntry, CacheError, CacheStore, EntrySummary, StoreStats};

/// Extension used for cache records
const RECORD_EXTENSION: &str = "json";

/// Stores cache entries as JSON files in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `cache_dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Returns the path to the record for `key`
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{}", key.as_str(), RECORD_EXTENSION))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Lists record files; a missing directory has no records
    fn record_paths(&self) -> Result<Vec<PathBuf>, CacheError> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(dir
            .filter_map(|item| item.ok())
            .map(|item| item.path())
            .filter(|path| is_record(path))
            .collect())
    }

    /// Reads and parses one record, returning `None` if it is unparseable
    fn read_record(path: &Path) -> Option<(CacheEntry, u64)> {
        let bytes = fs::read(path).ok()?;
        let entry = serde_json::from_slice::<CacheEntry>(&bytes).ok()?;
        Some((entry, bytes.len() as u64))
    }

    /// Best-effort removal of a corrupt record
    fn discard(path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed corrupt cache record"),
            Err(e) => debug!(path = %path.display(), error = %e, "could not remove corrupt cache record"),
        }
    }
}

fn is_record(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
}

impl CacheStore for FileStore {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.key == *key => Ok(Some(entry)),
            Ok(entry) => {
                debug!(expected = %key, found = %entry.key, "cache record key mismatch");
                Self::discard(&path);
                Ok(None)
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "unparseable cache record");
                Self::discard(&path);
                Ok(None)
            }
        }
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        self.ensure_dir()?;

        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        serde_json::to_writer_pretty(&mut tmp, entry)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(&entry.key))?;
        Ok(())
    }

    fn clear_all(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.record_paths()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => debug!(path = %path.display(), error = %e, "could not remove cache record"),
            }
        }
        Ok(removed)
    }

    fn stats(&self) -> Result<StoreStats, CacheError> {
        let summaries = self
            .record_paths()?
            .iter()
            .filter_map(|path| Self::read_record(path))
            .map(|(entry, size)| EntrySummary {
                key: entry.key,
                mode: entry.mode,
                label: entry.label,
                stored_at: entry.stored_at,
                ttl_seconds: entry.ttl_seconds,
                size,
            })
            .collect();
        Ok(StoreStats::from_summaries(summaries))
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.cache_dir)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
