//! Freshness policy: per-mode TTLs and the expiry check

use chrono::{DateTime, Duration, Utc};

use super::key::RequestMode;
use super::store::CacheEntry;

/// TTL for search results (1 hour)
pub const SEARCH_TTL_SECS: u64 = 3600;

/// TTL for user timelines (24 hours)
pub const USER_TTL_SECS: u64 = 86_400;

/// TTL for a single post with replies (24 hours)
pub const URL_TTL_SECS: u64 = 86_400;

/// Returns the TTL in seconds applied when writing an entry for `mode`
pub fn ttl_for(mode: RequestMode) -> u64 {
    match mode {
        RequestMode::Search => SEARCH_TTL_SECS,
        RequestMode::User => USER_TTL_SECS,
        RequestMode::Url => URL_TTL_SECS,
    }
}

/// The instant `ttl_seconds` after `stored_at`, saturating at the maximum
pub fn expiry_instant(stored_at: DateTime<Utc>, ttl_seconds: u64) -> DateTime<Utc> {
    let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
    stored_at
        .checked_add_signed(Duration::try_seconds(ttl).unwrap_or(Duration::MAX))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// The instant at which `entry` stops being fresh
pub fn expires_at(entry: &CacheEntry) -> DateTime<Utc> {
    expiry_instant(entry.stored_at, entry.ttl_seconds)
}

/// An entry is fresh strictly before its expiry instant
pub fn is_fresh(entry: &CacheEntry, now: DateTime<Utc>) -> bool {
    now < expires_at(entry)
}
