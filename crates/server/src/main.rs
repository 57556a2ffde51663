use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shuttle_tracker::prelude::*;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod feed;
mod sink;

use config::load_config;
use feed::HttpFeed;
use sink::LogSink;

#[derive(Parser, Debug)]
#[command(
    name = "shuttle-tracker-server",
    author,
    version,
    about = "Track campus shuttles and log live arrival estimates",
    long_about = "Polls the shuttle route and vehicle feeds, assigns each vehicle to \
                  the route it is driving, and logs estimated arrival times at the stops \
                  of that route.\n\n\
                  Set RUST_LOG (e.g. RUST_LOG=shuttle_tracker=debug) to control log output."
)]
struct Args {
    /// JSON configuration file
    #[arg(default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args.config).await?;
    info!(
        static_feed = %config.static_feed_url,
        dynamic_feed = %config.dynamic_feed_url,
        poll_interval_secs = config.tracker.poll_interval_secs,
        "configuration loaded"
    );

    let feed = HttpFeed::new(
        config.static_feed_url.as_str(),
        config.dynamic_feed_url.as_str(),
        config.fetch_timeout(),
    )
    .context("building HTTP client")?;

    let world: SharedWorld = Arc::new(RwLock::new(World::new(config.tracker.clone())));
    let handle = Scheduler::new(world, Arc::new(feed), &config.tracker)
        .with_sink(Arc::new(LogSink))
        .start()
        .await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutting down");
    handle.shutdown().await;

    Ok(())
}
