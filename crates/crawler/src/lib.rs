//! Bucket Crawler
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Lists a bucket, ingests new CSV objects into InfluxDB and marks them as
//! processed, then optionally cleans up old objects.
//!
//! # Overview
//!
//! - **Store**: [`store::ObjectStore`] with S3 and in-memory implementations
//! - **Decoding**: [`decoder::CsvDecoder`] turns objects into records
//! - **Sink**: [`sink::InfluxWriters`] writes records as points to one or
//!   more InfluxDB servers
//! - **Reconciliation**: [`reconcile::classify`] splits a listing into
//!   unprocessed, processed and orphan marker objects
//! - **Retention**: [`retention::filter_older_than_windows`] protects the most
//!   recent window folders from cleanup
//! - **Runner**: [`runner::TaskRunner`] bounded fan-out, first error wins
//! - **Orchestration**: [`orchestrator::Crawler`] drives a whole run

pub mod cli;
pub mod config;
pub mod decoder;
pub mod orchestrator;
pub mod reconcile;
pub mod retention;
pub mod runner;
pub mod sink;
pub mod store;
pub mod timefmt;

// Re-export commonly used types
pub use cli::Cli;
pub use config::{CrawlConfig, CrawlerConfig};
pub use orchestrator::{Crawler, RunSummary};
