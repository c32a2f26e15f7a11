//! Rendering of fetched results as JSON or a readable summary

use clap::ValueEnum;

use crate::cache::RequestMode;
use crate::data::TweetResults;

/// How results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    Json,
    /// Human-readable summary
    Summary,
}

/// Renders `results` in the requested format
pub fn render(results: &TweetResults, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(results),
        OutputFormat::Summary => Ok(render_summary(results)),
    }
}

fn mode_label(mode: RequestMode) -> &'static str {
    match mode {
        RequestMode::Search => "Search Results",
        RequestMode::User => "User Tweets",
        RequestMode::Url => "Tweet Details",
    }
}

/// Renders a block per post under a short header
pub fn render_summary(results: &TweetResults) -> String {
    let mut lines = vec![
        format!("=== X/Twitter {} ===", mode_label(results.mode)),
        format!("Query: {}", results.query),
        format!("Fetched: {}", results.fetched_at.to_rfc3339()),
        format!("Results: {} tweets", results.count),
        String::new(),
    ];

    for tweet in &results.tweets {
        lines.push("---".to_string());
        lines.push(format!("@{} ({})", tweet.author, tweet.author_name));
        lines.push(tweet.created_at.clone());
        lines.push(tweet.text.clone());
        lines.push(format!(
            "[Likes: {} | RTs: {} | Replies: {}]",
            tweet.likes, tweet.retweets, tweet.replies
        ));
        if !tweet.url.is_empty() {
            lines.push(tweet.url.clone());
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
