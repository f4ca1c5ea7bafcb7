//! Bucket Crawler - Main entry point

use anyhow::Context;
use clap::Parser;
use crawler::decoder::CsvDecoder;
use crawler::sink::InfluxWriters;
use crawler::store::S3Store;
use crawler::{Cli, Crawler, CrawlerConfig};
use crawler_common::logging::init_logging;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Values from .env behave like environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _guard = match cli
        .log_config()
        .map_err(anyhow::Error::from)
        .and_then(|config| init_logging(&config))
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(cli).await {
        error!(error = %format!("{:#}", e), "Crawler failed");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = CrawlerConfig::try_from(cli)?;
    info!(
        bucket = %config.store.bucket_url(),
        prefix = %config.crawl.prefix,
        suffix = %config.crawl.data_suffix,
        clean_objects = config.crawl.clean_objects,
        influx_servers = config.influx.servers.len(),
        "Starting bucket crawler"
    );

    let store = S3Store::new(config.store.clone())
        .await
        .context("Failed to initialize S3 store")?;
    let sink = InfluxWriters::new(&config.influx).context("Failed to initialize InfluxDB writers")?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling pending objects");
            signal_token.cancel();
        }
    });

    let crawler = Crawler::new(
        config.crawl,
        Arc::new(store),
        Arc::new(CsvDecoder::new()),
        Arc::new(sink),
    )
    .with_shutdown(shutdown);

    crawler.run().await?;

    Ok(())
}
