//! Application workflow
//!
//! Ties the CLI, the cache and the Apify client together: serve from cache
//! when possible, otherwise fetch, cache and print.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::cache::{CacheLookup, CacheManager, CacheReport};
use crate::cli::{CliError, FetchConfig, RunConfig, Target};
use crate::config::{Config, ConfigError};
use crate::data::{ApifyClient, ApifyError, TweetResults};
use crate::output;

/// Errors that end a run
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Apify(#[from] ApifyError),

    /// Results could not be rendered
    #[error("Failed to format output: {0}")]
    Format(#[from] serde_json::Error),

    /// The output file could not be written
    #[error("Failed to write output to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Results of a fetch and where they came from
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub results: TweetResults,
    /// When the results were cached, if they were served from cache
    pub cached_at: Option<DateTime<Utc>>,
}

impl FetchOutcome {
    pub fn from_cache(&self) -> bool {
        self.cached_at.is_some()
    }
}

/// Runs commands against the cache and the scraper
pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes a resolved command, printing its output
    pub async fn run(&self, run: RunConfig) -> Result<(), AppError> {
        match run {
            RunConfig::ClearCache => {
                let cache_dir = self.config.cache_dir()?;
                if !cache_dir.exists() {
                    println!("Cache directory does not exist.");
                    return Ok(());
                }
                let count = self.clear_cache()?;
                println!("Cleared {} cached result(s).", count);
            }
            RunConfig::CacheStats => {
                print!("{}", self.cache_report()?);
            }
            RunConfig::Fetch(fetch) => {
                let outcome = self.fetch(&fetch).await?;
                self.write_output(&fetch, &outcome)?;
            }
        }
        Ok(())
    }

    fn cache_manager(&self) -> Result<CacheManager, ConfigError> {
        Ok(CacheManager::with_dir(self.config.cache_dir()?))
    }

    /// Removes all cached results
    pub fn clear_cache(&self) -> Result<usize, AppError> {
        Ok(self.cache_manager()?.clear())
    }

    /// Collects cache statistics
    pub fn cache_report(&self) -> Result<CacheReport, AppError> {
        Ok(self.cache_manager()?.report())
    }

    /// Serves `fetch` from cache when fresh, otherwise from the scraper
    ///
    /// Cache problems never fail the fetch; they only cost a paid call.
    pub async fn fetch(&self, fetch: &FetchConfig) -> Result<FetchOutcome, AppError> {
        let target = &fetch.target;
        let request = target.cache_request(fetch.max_results);

        let cache = if fetch.use_cache {
            match self.cache_manager() {
                Ok(cache) => Some(cache),
                Err(e) => {
                    warn!(error = %e, "cache unavailable, fetching fresh");
                    None
                }
            }
        } else {
            None
        };

        let mut miss_key = None;
        if let Some(cache) = &cache {
            match cache.lookup::<TweetResults>(&request) {
                CacheLookup::Hit { payload, cached_at } => {
                    eprintln!(
                        "[cached] {} (fetched {})",
                        describe(target),
                        cached_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                    return Ok(FetchOutcome {
                        results: payload,
                        cached_at: Some(cached_at),
                    });
                }
                CacheLookup::Miss { key } => miss_key = Some(key),
            }
        }

        eprintln!("{}", fetching_message(target));
        let client = ApifyClient::new(self.config.api_token()?, &self.config.actor_id)
            .with_base_url(&self.config.api_base);
        let items = client.run(&target.actor_input(fetch.max_results)).await?;
        info!(count = items.len(), "fetched items from Apify");

        let results = TweetResults::from_items(target.mode(), &query_label(target), &items);

        if let (Some(cache), Some(key)) = (&cache, &miss_key) {
            cache.store(key, &request, &results);
        }

        Ok(FetchOutcome {
            results,
            cached_at: None,
        })
    }

    fn write_output(&self, fetch: &FetchConfig, outcome: &FetchOutcome) -> Result<(), AppError> {
        let rendered = output::render(&outcome.results, fetch.format)?;

        match &fetch.output {
            Some(path) => {
                fs::write(path, &rendered).map_err(|source| AppError::Output {
                    path: path.clone(),
                    source,
                })?;
                eprintln!("Results saved to: {}", path.display());
            }
            None => println!("{}", rendered),
        }

        if !outcome.from_cache() {
            eprintln!("\n[Apify credits used - check https://console.apify.com/billing]");
        }
        Ok(())
    }
}

/// The `query` recorded in results: the post URL as given for post fetches
fn query_label(target: &Target) -> String {
    match target {
        Target::Post { url, .. } => url.clone(),
        other => other.identifier(),
    }
}

fn describe(target: &Target) -> String {
    match target {
        Target::Search { query } => format!("Search results for: {}", query),
        Target::Users { usernames } => format!("Tweets from: @{}", usernames.join(", @")),
        Target::Post { id, .. } => format!("Tweet: {}", id),
    }
}

fn fetching_message(target: &Target) -> String {
    match target {
        Target::Search { query } => format!("Searching tweets for: {}", query),
        Target::Users { usernames } => format!("Fetching tweets from: @{}", usernames.join(", @")),
        Target::Post { id, .. } => format!("Fetching tweet: {}", id),
    }
}
