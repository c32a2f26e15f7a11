//! Cache module for storing scraper responses to disk
//!
//! Responses are keyed by a digest of the normalized request and kept as
//! JSON files with a per-mode TTL, so repeated invocations reuse paid
//! results. Every cache fault degrades to a miss: a failing cache never
//! stops a fresh fetch from being returned.

mod file;
mod key;
mod manager;
pub mod policy;
mod report;
mod store;

pub use file::FileStore;
pub use key::{CacheKey, CacheRequest, RequestMode};
pub use manager::{CacheLookup, CacheManager};
pub use report::{format_age, CacheReport, ReportLine};
pub use store::{CacheEntry, CacheError, CacheStore, EntrySummary, MemoryStore, StoreStats};
