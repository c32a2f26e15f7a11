//! Input sanitation for queries, usernames and post URLs

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest search query sent to the scraper, in characters
pub const MAX_QUERY_LENGTH: usize = 500;

/// X usernames are at most 15 characters
pub const MAX_USERNAME_LENGTH: usize = 15;

/// Path segments of x.com that are not usernames
const RESERVED_PATHS: [&str; 6] = ["status", "search", "explore", "home", "i", "intent"];

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x{9f}]").unwrap());

static INVISIBLE_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x{200b}-\x{200f}\x{2028}-\x{202f}\x{2060}-\x{206f}\x{feff}]").unwrap()
});

static USERNAME_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").unwrap());

static STATUS_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/status/(\d+)").unwrap());

static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{10,}$").unwrap());

static PROFILE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:twitter\.com|x\.com)/([a-zA-Z0-9_]+)(?:/|$|\?)").unwrap());

/// Strips control and invisible characters, limits length and trims
pub fn sanitize_query(query: &str) -> String {
    let cleaned = CONTROL_CHARS.replace_all(query, "");
    let cleaned = INVISIBLE_CHARS.replace_all(&cleaned, "");
    let truncated: String = cleaned.chars().take(MAX_QUERY_LENGTH).collect();
    truncated.trim().to_string()
}

/// Reduces a username to the characters X allows, without the leading `@`
pub fn sanitize_username(username: &str) -> String {
    let stripped = username.trim().trim_start_matches('@');
    let cleaned = USERNAME_DISALLOWED.replace_all(stripped, "");
    cleaned.chars().take(MAX_USERNAME_LENGTH).collect()
}

/// Sanitizes a comma-separated list of usernames or profile URLs
///
/// Empty names are dropped; order is preserved.
pub fn sanitize_usernames(usernames: &str) -> Vec<String> {
    usernames
        .split(',')
        .map(|part| {
            let part = part.trim();
            match extract_username_from_url(part) {
                Some(name) => sanitize_username(&name),
                None => sanitize_username(part),
            }
        })
        .filter(|name| !name.is_empty())
        .collect()
}

/// Extracts the numeric post ID from a status URL or a bare ID
///
/// Accepts `https://x.com/user/status/123`, the twitter.com and
/// mobile.twitter.com equivalents, and IDs of at least ten digits.
pub fn extract_tweet_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    if let Some(caps) = STATUS_ID.captures(url) {
        return Some(caps[1].to_string());
    }
    if BARE_ID.is_match(url) {
        return Some(url.to_string());
    }
    None
}

/// Extracts the username from an x.com or twitter.com profile URL
pub fn extract_username_from_url(url: &str) -> Option<String> {
    let caps = PROFILE_URL.captures(url)?;
    let username = &caps[1];
    if RESERVED_PATHS.contains(&username.to_lowercase().as_str()) {
        return None;
    }
    Some(username.to_string())
}
