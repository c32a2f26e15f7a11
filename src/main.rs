//! xscrape - Fetch X/Twitter posts via Apify with local caching
//!
//! Searches, user timelines and single posts are fetched through the Apify
//! Twitter scraper. Responses are cached on disk so repeated requests do not
//! spend credits.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xscrape::app::App;
use xscrape::cli::{Cli, CliError, RunConfig};
use xscrape::config::Config;

/// Initializes logging to stderr, filtered by `RUST_LOG`
///
/// Defaults to warnings only so stdout carries nothing but results.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "xscrape=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let run = match RunConfig::from_cli(&cli) {
        Ok(run) => run,
        Err(e @ CliError::MissingMode) => {
            let _ = Cli::command().print_help();
            eprintln!("\nError: {}", e);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let app = App::new(Config::from_env());
    match app.run(run).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
