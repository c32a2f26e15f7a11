//! xscrape library
//!
//! Fetches X/Twitter posts through the Apify scraper and caches responses
//! on disk. Modules are exposed for use in integration tests.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod output;
