//! Ticketdesk - command-line admin client for the event ticketing backend.
//!
//! Lists and registers organizers, participants and staff users, and shows
//! per-organizer transactions. Every request goes through the authenticated
//! fetch wrapper from `ticketdesk-core`.

mod app;
mod cli;
mod navigator;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ticketdesk_core::Config;

use app::App;
use cli::Cli;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "ticketdesk.log";

/// Initialize the tracing subscriber for logging.
///
/// RUST_LOG wins over `default_filter`. With `log_dir` set, output goes to a
/// daily rolling file there instead of stderr; the returned guard must be
/// held until exit so buffered lines are flushed.
fn init_tracing(default_filter: &str, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config_result = Config::load();
    let mut config = config_result.as_ref().cloned().unwrap_or_default();
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }

    let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));

    let _log_guard = init_tracing(&cli.log_level, config.log_to_file.then_some(cache_dir.as_path()));
    if let Err(e) = config_result {
        warn!(error = %e, "Failed to load config, using defaults");
    }
    info!(api = %config.api_base_url, "Ticketdesk starting");

    // Where the user "was" when a redirect to login happens
    let location = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let mut app = App::new(config, cache_dir, &location)?;
    let result = app.run(cli.command).await;

    info!(ok = result.is_ok(), "Ticketdesk exiting");
    result
}
