//! Core data models for xscrape
//!
//! Posts returned by the scraper are loosely shaped JSON; this module
//! normalizes them into [`Tweet`] records and wraps them with request
//! metadata in [`TweetResults`], which is also what gets cached.

pub mod apify;
pub mod sanitize;

pub use apify::{ActorInput, ApifyClient, ApifyError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::RequestMode;

/// A single post, normalized from the scraper's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    /// Post ID, always as a string
    pub id: String,
    /// Post text
    pub text: String,
    /// Author's handle, without `@`
    pub author: String,
    /// Author's display name
    pub author_name: String,
    /// Creation time as reported by the scraper
    pub created_at: String,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    /// Link to the post
    pub url: String,
}

/// Results of one request, as printed and cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetResults {
    /// Query text, username(s) or post URL the results are for
    pub query: String,
    /// Request mode
    pub mode: RequestMode,
    /// When the results were fetched from the scraper
    pub fetched_at: DateTime<Utc>,
    /// Number of posts
    pub count: usize,
    pub tweets: Vec<Tweet>,
}

impl TweetResults {
    /// Normalizes raw scraper items into results for `identifier`
    pub fn from_items(mode: RequestMode, identifier: &str, items: &[Value]) -> Self {
        let tweets: Vec<Tweet> = items.iter().map(Tweet::from_item).collect();
        Self {
            query: identifier.to_string(),
            mode,
            fetched_at: Utc::now(),
            count: tweets.len(),
            tweets,
        }
    }
}

impl Tweet {
    /// Builds a post from one scraper item, tolerating either field naming
    pub fn from_item(item: &Value) -> Self {
        let user = &item["user"];
        let author = str_field(user, &["screen_name"]);
        let id = first_present(item, &["id_str", "id"])
            .map(value_to_string)
            .unwrap_or_default();

        let url = match str_field(item, &["url"]) {
            url if !url.is_empty() => url,
            _ if !author.is_empty() && !id.is_empty() => {
                format!("https://x.com/{}/status/{}", author, id)
            }
            _ => String::new(),
        };

        Self {
            text: str_field(item, &["text", "full_text"]),
            author_name: str_field(user, &["name"]),
            created_at: str_field(item, &["created_at", "createdAt"]),
            likes: count_field(item, &["favorite_count", "likeCount"]),
            retweets: count_field(item, &["retweet_count", "retweetCount"]),
            replies: count_field(item, &["conversation_count", "replyCount"]),
            author,
            id,
            url,
        }
    }
}

/// Returns the first of `fields` that is present and not null
fn first_present<'a>(item: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| item.get(field))
        .find(|value| !value.is_null())
}

fn str_field(item: &Value, fields: &[&str]) -> String {
    first_present(item, fields)
        .map(value_to_string)
        .unwrap_or_default()
}

fn count_field(item: &Value, fields: &[&str]) -> u64 {
    first_present(item, fields)
        .and_then(|value| value.as_u64().or_else(|| value.as_str()?.parse().ok()))
        .unwrap_or(0)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
