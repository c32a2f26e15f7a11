//! Cache key derivation
//!
//! Turns a logical request (mode plus parameter) into a stable SHA-256 hex
//! digest. Parameters are normalized first so that semantically equal
//! requests share a key.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::data::sanitize::extract_tweet_id;

/// The kind of request being made against the scraper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Keyword / hashtag search
    Search,
    /// Timeline of one or more users
    User,
    /// A single post and its replies
    Url,
}

impl RequestMode {
    /// Returns the lowercase name used on disk and in output
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Search => "search",
            RequestMode::User => "user",
            RequestMode::Url => "url",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical request descriptor, before key derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRequest {
    /// Request mode
    pub mode: RequestMode,
    /// Query text, comma-separated usernames, or post URL / ID
    pub param: String,
    /// Result-count limit, when it affects the response shape
    pub limit: Option<u32>,
}

impl CacheRequest {
    pub fn new(mode: RequestMode, param: impl Into<String>) -> Self {
        Self {
            mode,
            param: param.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns the normalized form of the parameter for this request's mode
    pub fn normalized_param(&self) -> String {
        match self.mode {
            RequestMode::Search => normalize_query(&self.param),
            RequestMode::User => normalize_usernames(&self.param),
            RequestMode::Url => normalize_post_ref(&self.param),
        }
    }
}

/// Opaque cache key: a 64-character lowercase hex digest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a request
    pub fn derive(request: &CacheRequest) -> Self {
        let normalized = request.normalized_param();
        let limit = request
            .limit
            .map(|n| n.to_string())
            .unwrap_or_default();

        // NUL separators keep ("ab", "c") and ("a", "bc") apart
        let mut hasher = Sha256::new();
        hasher.update(request.mode.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(normalized.as_bytes());
        hasher.update([0u8]);
        hasher.update(limit.as_bytes());

        let hex: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Self(hex)
    }

    /// Wraps an already-derived key, e.g. one read back from disk
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
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

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

fn normalize_usernames(usernames: &str) -> String {
    let mut names: Vec<String> = usernames
        .split(',')
        .map(|name| name.trim().trim_start_matches('@').trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names.join(",")
}

fn normalize_post_ref(reference: &str) -> String {
    let trimmed = reference.trim();
    extract_tweet_id(trimmed).unwrap_or_else(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(mode: RequestMode, param: &str) -> CacheKey {
        CacheKey::derive(&CacheRequest::new(mode, param))
    }

    #[test]
    fn test_key_is_fixed_length_hex() {
        let k = key(RequestMode::Search, "OpenAI");
        assert_eq!(k.as_str().len(), 64);
        assert!(k.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(k.as_str(), k.as_str().to_lowercase());
    }

    #[test]
    fn test_key_is_deterministic() {
        assert_eq!(
            key(RequestMode::Search, "rust lang"),
            key(RequestMode::Search, "rust lang")
        );
    }

    #[test]
    fn test_key_does_not_leak_query_text() {
        let k = key(RequestMode::Search, "secretterm");
        assert!(!k.as_str().contains("secretterm"));
    }

    #[test]
    fn test_search_query_is_trimmed_and_case_folded() {
        assert_eq!(
            key(RequestMode::Search, "  OpenAI "),
            key(RequestMode::Search, "openai")
        );
    }

    #[test]
    fn test_usernames_are_sorted_and_deduplicated() {
        assert_eq!(key(RequestMode::User, "A,B"), key(RequestMode::User, "b, a"));
        assert_eq!(
            key(RequestMode::User, "@elonmusk"),
            key(RequestMode::User, "ElonMusk,elonmusk")
        );
    }

    #[test]
    fn test_post_url_canonicalizes_to_id() {
        let by_url = key(RequestMode::Url, "https://x.com/someone/status/1234567890123");
        let by_twitter = key(
            RequestMode::Url,
            "https://twitter.com/other/status/1234567890123?s=20",
        );
        let by_id = key(RequestMode::Url, " 1234567890123 ");
        assert_eq!(by_url, by_id);
        assert_eq!(by_twitter, by_id);
    }

    #[test]
    fn test_unextractable_post_ref_uses_trimmed_string() {
        let request = CacheRequest::new(RequestMode::Url, "  https://x.com/someone ");
        assert_eq!(request.normalized_param(), "https://x.com/someone");
    }

    #[test]
    fn test_different_modes_give_different_keys() {
        assert_ne!(
            key(RequestMode::Search, "elonmusk"),
            key(RequestMode::User, "elonmusk")
        );
    }

    #[test]
    fn test_different_params_give_different_keys() {
        let samples = ["rust", "rustlang", "rust lang", "#rust", "go", "python"];
        let keys: Vec<CacheKey> = samples
            .iter()
            .map(|s| key(RequestMode::Search, s))
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_limit_is_part_of_key() {
        let base = CacheRequest::new(RequestMode::Search, "rust");
        let twenty = base.clone().with_limit(20);
        let fifty = base.clone().with_limit(50);
        assert_ne!(CacheKey::derive(&twenty), CacheKey::derive(&fifty));
        assert_ne!(CacheKey::derive(&base), CacheKey::derive(&twenty));
        assert_eq!(CacheKey::derive(&twenty), CacheKey::derive(&base.with_limit(20)));
    }

    #[test]
    fn test_known_digest_is_stable_across_runs() {
        // sha256("search\0openai\0")
        let k = key(RequestMode::Search, "OpenAI");
        let mut hasher = Sha256::new();
        hasher.update(b"search\0openai\0");
        let expected: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        assert_eq!(k.as_str(), expected);
    }

    #[test]
    fn test_request_mode_serializes_lowercase() {
        let json = serde_json::to_string(&RequestMode::Url).unwrap();
        assert_eq!(json, "\"url\"");
        let mode: RequestMode = serde_json::from_str("\"search\"").unwrap();
        assert_eq!(mode, RequestMode::Search);
    }
}
