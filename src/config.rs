//! Configuration Module
//!
//! Loads the Apify credentials and cache location from environment variables.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

use crate::data::apify::{APIFY_API_BASE, DEFAULT_ACTOR_ID};

/// Environment variable holding the Apify API token
pub const TOKEN_VAR: &str = "APIFY_API_TOKEN";

/// Environment variable overriding the actor
pub const ACTOR_VAR: &str = "APIFY_ACTOR_ID";

/// Environment variable overriding the API base URL
pub const API_BASE_VAR: &str = "APIFY_API_BASE";

/// Environment variable overriding the cache directory
pub const CACHE_DIR_VAR: &str = "X_APIFY_CACHE_DIR";

/// Name of the cache directory created next to the executable
const CACHE_DIR_NAME: &str = ".cache";

/// Errors in the runtime configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API token was provided
    #[error(
        "APIFY_API_TOKEN environment variable not set.\n\n\
         Setup instructions:\n\
         1. Create free account: https://apify.com/\n\
         2. Get API token: https://console.apify.com/account/integrations\n\
         3. Export: export APIFY_API_TOKEN='apify_api_YOUR_TOKEN'"
    )]
    MissingToken,

    /// No cache directory could be determined
    #[error("could not determine a cache directory; set X_APIFY_CACHE_DIR")]
    NoCacheDir,
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Apify API token, if set
    pub api_token: Option<String>,
    /// Actor to run
    pub actor_id: String,
    /// Apify API base URL
    pub api_base: String,
    /// Explicit cache directory, if set
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `APIFY_API_TOKEN` - API token (required for fetching)
    /// - `APIFY_ACTOR_ID` - Actor ID (default: `quacker~twitter-scraper`)
    /// - `APIFY_API_BASE` - API base URL (default: `https://api.apify.com/v2`)
    /// - `X_APIFY_CACHE_DIR` - Cache directory (default: `.cache` next to the binary)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a Config from any variable lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            api_token: get(TOKEN_VAR),
            actor_id: get(ACTOR_VAR).unwrap_or_else(|| DEFAULT_ACTOR_ID.to_string()),
            api_base: get(API_BASE_VAR).unwrap_or_else(|| APIFY_API_BASE.to_string()),
            cache_dir: get(CACHE_DIR_VAR).map(PathBuf::from),
        }
    }

    /// Returns the API token or setup instructions
    pub fn api_token(&self) -> Result<&str, ConfigError> {
        self.api_token.as_deref().ok_or(ConfigError::MissingToken)
    }

    /// Resolves the cache directory
    ///
    /// Order: explicit override, `.cache` next to the executable, then the
    /// platform cache directory (`~/.cache/xscrape` on Linux).
    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.cache_dir {
            return Ok(dir.clone());
        }
        if let Some(dir) = exe_relative_cache_dir() {
            return Ok(dir);
        }
        ProjectDirs::from("", "", "xscrape")
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .ok_or(ConfigError::NoCacheDir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn exe_relative_cache_dir() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    Some(exe.parent()?.join(CACHE_DIR_NAME))
}
