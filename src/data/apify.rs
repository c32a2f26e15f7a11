//! Apify API client
//!
//! Starts a run of the Twitter scraper actor, polls it until it finishes
//! and downloads the resulting dataset items.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Base URL for the Apify API
pub const APIFY_API_BASE: &str = "https://api.apify.com/v2";

/// Actor used when none is configured
pub const DEFAULT_ACTOR_ID: &str = "quacker~twitter-scraper";

/// Items requested for a single post, so replies come along
pub const POST_MAX_ITEMS: u32 = 50;

/// Delay between run status checks
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Longest time to wait for a run to finish
const MAX_WAIT: Duration = Duration::from_secs(180);

const START_TIMEOUT: Duration = Duration::from_secs(30);
const STATUS_TIMEOUT: Duration = Duration::from_secs(10);
const DATASET_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when running the scraper
#[derive(Debug, Error)]
pub enum ApifyError {
    /// The API token was rejected
    #[error("Invalid API token.")]
    InvalidToken,

    /// The account has run out of credits
    #[error("Apify quota exceeded. Check your billing: https://console.apify.com/billing")]
    QuotaExceeded,

    /// Any other non-success HTTP status
    #[error("Apify returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The response did not have the expected shape
    #[error("Unexpected response from Apify: {0}")]
    UnexpectedResponse(String),

    /// The actor run ended without succeeding
    #[error("Apify actor {0}.")]
    RunFailed(String),

    /// The run did not finish in time
    #[error("Timeout waiting for Apify actor after {0} seconds.")]
    Timeout(u64),
}

/// A URL the actor should start scraping from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartUrl {
    pub url: String,
}

/// Input document for an actor run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_terms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_urls: Option<Vec<StartUrl>>,
    pub max_items: u32,
}

impl ActorInput {
    /// Input for a keyword search
    pub fn search(query: &str, max_items: u32) -> Self {
        Self {
            search_terms: Some(vec![query.to_string()]),
            start_urls: None,
            max_items,
        }
    }

    /// Input for the timelines of one or more users
    pub fn users(usernames: &[String], max_items: u32) -> Self {
        Self {
            search_terms: None,
            start_urls: Some(
                usernames
                    .iter()
                    .map(|name| StartUrl {
                        url: format!("https://x.com/{}", name),
                    })
                    .collect(),
            ),
            max_items,
        }
    }

    /// Input for a single post and its replies
    ///
    /// A bare ID is turned into a status URL.
    pub fn post(url: &str, tweet_id: &str) -> Self {
        let url = if url.starts_with("http") {
            url.to_string()
        } else {
            format!("https://x.com/i/status/{}", tweet_id)
        };
        Self {
            search_terms: None,
            start_urls: Some(vec![StartUrl { url }]),
            max_items: POST_MAX_ITEMS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    data: RunData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    status: String,
    default_dataset_id: Option<String>,
}

/// Client for running the scraper actor on Apify
#[derive(Debug, Clone)]
pub struct ApifyClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Base URL for the API (allows override for testing)
    base_url: String,
    actor_id: String,
    token: String,
    poll_interval: Duration,
    max_wait: Duration,
}

impl ApifyClient {
    /// Creates a client for `actor_id` authenticated with `token`
    pub fn new(token: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: APIFY_API_BASE.to_string(),
            actor_id: actor_id.into(),
            token: token.into(),
            poll_interval: POLL_INTERVAL,
            max_wait: MAX_WAIT,
        }
    }

    /// Overrides the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides how often and how long a run is polled
    pub fn with_polling(mut self, poll_interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.max_wait = max_wait;
        self
    }

    /// Runs the actor with `input` and returns the raw dataset items
    pub async fn run(&self, input: &ActorInput) -> Result<Vec<Value>, ApifyError> {
        let run = self.start_run(input).await?;
        info!(run_id = %run.id, actor = %self.actor_id, "started Apify run");

        let finished = self.wait_for_run(&run.id).await?;
        let dataset_id = finished
            .default_dataset_id
            .or(run.default_dataset_id)
            .ok_or_else(|| ApifyError::UnexpectedResponse("run has no dataset".to_string()))?;

        self.fetch_items(&dataset_id).await
    }

    async fn start_run(&self, input: &ActorInput) -> Result<RunData, ApifyError> {
        let url = format!("{}/acts/{}/runs", self.base_url, self.actor_id);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(input)
            .timeout(START_TIMEOUT)
            .send()
            .await?;

        let envelope: RunEnvelope = check_status(response).await?.json().await?;
        Ok(envelope.data)
    }

    async fn wait_for_run(&self, run_id: &str) -> Result<RunData, ApifyError> {
        let url = format!("{}/actor-runs/{}", self.base_url, run_id);
        let deadline = Instant::now() + self.max_wait;

        loop {
            let response = self
                .http_client
                .get(&url)
                .bearer_auth(&self.token)
                .timeout(STATUS_TIMEOUT)
                .send()
                .await?;
            let run = check_status(response).await?.json::<RunEnvelope>().await?.data;
            debug!(run_id, status = %run.status, "polled Apify run");

            match run.status.as_str() {
                "SUCCEEDED" => return Ok(run),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ApifyError::RunFailed(run.status.to_lowercase()))
                }
                _ => {}
            }

            if Instant::now() >= deadline {
                return Err(ApifyError::Timeout(self.max_wait.as_secs()));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch_items(&self, dataset_id: &str) -> Result<Vec<Value>, ApifyError> {
        let url = format!("{}/datasets/{}/items", self.base_url, dataset_id);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(DATASET_TIMEOUT)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }
}

/// Maps error statuses to `ApifyError`, passing successful responses through
async fn check_status(response: Response) -> Result<Response, ApifyError> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(ApifyError::InvalidToken),
        StatusCode::PAYMENT_REQUIRED => Err(ApifyError::QuotaExceeded),
        status if !status.is_success() => Err(ApifyError::Status {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        }),
        _ => Ok(response),
    }
}
