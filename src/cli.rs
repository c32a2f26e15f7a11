//! Command-line interface parsing for xscrape
//!
//! This module handles parsing of CLI arguments using clap and resolving
//! them into a [`RunConfig`]: a cache management command or a validated
//! fetch request.

use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use thiserror::Error;

use crate::cache::{CacheRequest, RequestMode};
use crate::data::apify::ActorInput;
use crate::data::sanitize::{extract_tweet_id, sanitize_query, sanitize_usernames};
use crate::output::OutputFormat;

/// Results fetched when `--max-results` is not given
pub const DEFAULT_MAX_RESULTS: u32 = 20;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// None of --search, --user or --url was given
    #[error("Specify --search, --user, or --url")]
    MissingMode,

    /// The query was empty after sanitation
    #[error("Empty search query.")]
    EmptyQuery,

    /// No valid username remained after sanitation
    #[error("Invalid username: '{0}'")]
    InvalidUsername(String),

    /// No post ID could be found in the URL
    #[error("Could not extract tweet ID from: {0}")]
    InvalidTweetUrl(String),
}

/// xscrape - Fetch X/Twitter posts via Apify with local caching
#[derive(Parser, Debug)]
#[command(name = "xscrape")]
#[command(about = "Fetch X/Twitter data via Apify API with local caching")]
#[command(version)]
#[command(group(ArgGroup::new("mode").args(["search", "user", "url"])))]
pub struct Cli {
    /// Search tweets by keywords, hashtags, mentions
    #[arg(short, long, value_name = "QUERY")]
    pub search: Option<String>,

    /// Get tweets from one or more users (comma-separated)
    #[arg(short, long, value_name = "USERNAMES")]
    pub user: Option<String>,

    /// Get a specific tweet and replies by URL
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Maximum results to fetch
    #[arg(
        short = 'n',
        long,
        default_value_t = DEFAULT_MAX_RESULTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_results: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Bypass cache (always fetch fresh)
    #[arg(long)]
    pub no_cache: bool,

    /// Clear all cached results and exit
    #[arg(long)]
    pub clear_cache: bool,

    /// Show cache statistics and exit
    #[arg(long)]
    pub cache_stats: bool,
}

/// What to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Keyword search
    Search { query: String },
    /// Timelines of one or more users
    Users { usernames: Vec<String> },
    /// A single post; `url` is what the user gave, `id` the extracted ID
    Post { url: String, id: String },
}

impl Target {
    pub fn mode(&self) -> RequestMode {
        match self {
            Target::Search { .. } => RequestMode::Search,
            Target::Users { .. } => RequestMode::User,
            Target::Post { .. } => RequestMode::Url,
        }
    }

    /// Text identifying the request in output and status messages
    pub fn identifier(&self) -> String {
        match self {
            Target::Search { query } => query.clone(),
            Target::Users { usernames } => usernames.join(","),
            Target::Post { id, .. } => id.clone(),
        }
    }

    /// The cache descriptor; post fetches have a fixed size so carry no limit
    pub fn cache_request(&self, max_results: u32) -> CacheRequest {
        let request = CacheRequest::new(self.mode(), self.identifier());
        match self {
            Target::Post { .. } => request,
            _ => request.with_limit(max_results),
        }
    }

    /// The actor input for this target
    pub fn actor_input(&self, max_results: u32) -> ActorInput {
        match self {
            Target::Search { query } => ActorInput::search(query, max_results),
            Target::Users { usernames } => ActorInput::users(usernames, max_results),
            Target::Post { url, id } => ActorInput::post(url, id),
        }
    }
}

/// A validated fetch request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub target: Target,
    pub max_results: u32,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    /// Whether to read from and write to the cache
    pub use_cache: bool,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, PartialEq)]
pub enum RunConfig {
    /// Remove all cached results
    ClearCache,
    /// Print cache statistics
    CacheStats,
    /// Fetch posts
    Fetch(FetchConfig),
}

impl RunConfig {
    /// Creates a RunConfig from parsed CLI arguments.
    ///
    /// Cache management flags win over fetch modes and need no token.
    ///
    /// # Returns
    /// * `Ok(RunConfig)` with the resolved command
    /// * `Err(CliError)` if no mode was given or its value is unusable
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.clear_cache {
            return Ok(RunConfig::ClearCache);
        }
        if cli.cache_stats {
            return Ok(RunConfig::CacheStats);
        }

        let target = if let Some(query) = &cli.search {
            parse_search(query)?
        } else if let Some(users) = &cli.user {
            parse_users(users)?
        } else if let Some(url) = &cli.url {
            parse_post(url)?
        } else {
            return Err(CliError::MissingMode);
        };

        Ok(RunConfig::Fetch(FetchConfig {
            target,
            max_results: cli.max_results,
            format: cli.format,
            output: cli.output.clone(),
            use_cache: !cli.no_cache,
        }))
    }
}

/// Validates a search query
pub fn parse_search(query: &str) -> Result<Target, CliError> {
    let query = sanitize_query(query);
    if query.is_empty() {
        return Err(CliError::EmptyQuery);
    }
    Ok(Target::Search { query })
}

/// Validates a comma-separated list of usernames or profile URLs
pub fn parse_users(users: &str) -> Result<Target, CliError> {
    let usernames = sanitize_usernames(users);
    if usernames.is_empty() {
        return Err(CliError::InvalidUsername(users.to_string()));
    }
    Ok(Target::Users { usernames })
}

/// Validates a post URL or bare ID
pub fn parse_post(url: &str) -> Result<Target, CliError> {
    let url = url.trim();
    let id = extract_tweet_id(url).ok_or_else(|| CliError::InvalidTweetUrl(url.to_string()))?;
    Ok(Target::Post {
        url: url.to_string(),
        id,
    })
}
