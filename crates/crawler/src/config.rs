//! Crawler configuration
//!
//! Plain values built from the command line (see [`crate::cli`]) and checked
//! once by [`CrawlerConfig::validate`] before any I/O happens.

use crawler_common::{CrawlerError, Result};
use std::time::Duration;
use tracing::warn;

use crate::sink::InfluxConfig;
use crate::store::StoreConfig;
use crate::timefmt::validate_layout;

// ============================================================================
// Defaults
// ============================================================================

/// Default AWS region when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default suffix of marker objects.
pub const DEFAULT_MARKER_SUFFIX: &str = "processed";

/// Default age an object must exceed before cleanup (10 minutes).
pub const DEFAULT_MAX_OBJECT_AGE_SECS: u64 = 600;

/// Default deadline for a whole run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of objects handled concurrently.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default layout of retention window folders.
pub const DEFAULT_WINDOW_LAYOUT: &str = "%Y-%m-%d";

/// Default column holding the point timestamp.
pub const DEFAULT_TIMESTAMP_ROW: &str = "timestamp";

/// Default layout of the timestamp column.
pub const DEFAULT_TIMESTAMP_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// What one run does with the bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Only keys under this prefix are listed
    pub prefix: String,
    /// Suffix identifying data objects. Empty disables ingestion.
    pub data_suffix: String,
    /// Replaces `data_suffix` to form the marker key
    pub marker_suffix: String,
    pub clean_objects: bool,
    /// Objects younger than this are never cleaned
    pub max_object_age: Duration,
    /// Most recent window folders protected from cleanup; 0 disables
    pub windows_to_retain: usize,
    pub window_layout: String,
    pub timeout: Duration,
    pub max_concurrency: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            data_suffix: String::new(),
            marker_suffix: DEFAULT_MARKER_SUFFIX.to_string(),
            clean_objects: false,
            max_object_age: Duration::from_secs(DEFAULT_MAX_OBJECT_AGE_SECS),
            windows_to_retain: 0,
            window_layout: DEFAULT_WINDOW_LAYOUT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_suffix.is_empty() {
            warn!("No data suffix configured, nothing will be ingested or cleaned");
        }

        if self.marker_suffix.is_empty() {
            return Err(CrawlerError::config("Processed flag suffix cannot be empty"));
        }

        if self.data_suffix == self.marker_suffix {
            warn!(
                suffix = %self.data_suffix,
                "Data suffix and processed flag suffix are identical, markers will be taken for data objects"
            );
        }

        if self.windows_to_retain > 0 && !validate_layout(&self.window_layout) {
            return Err(CrawlerError::config(format!(
                "Invalid window layout '{}'",
                self.window_layout
            )));
        }

        if self.timeout.is_zero() {
            return Err(CrawlerError::config("Timeout must be greater than 0"));
        }

        if self.max_concurrency == 0 {
            warn!("Max concurrency is 0, running one task at a time");
        }

        Ok(())
    }
}

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub store: StoreConfig,
    pub influx: InfluxConfig,
    pub crawl: CrawlConfig,
}

impl CrawlerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store.bucket.is_empty() {
            return Err(CrawlerError::config("Bucket cannot be empty"));
        }

        if self.store.region.is_empty() {
            return Err(CrawlerError::config("Region cannot be empty"));
        }

        if self.store.access_key.is_some() != self.store.secret_key.is_some() {
            return Err(CrawlerError::config(
                "Access key and secret key must be given together",
            ));
        }

        self.crawl.validate()?;
        validate_influx(&self.influx)?;

        Ok(())
    }
}

fn validate_influx(influx: &InfluxConfig) -> Result<()> {
    if influx.servers.is_empty() {
        return Err(CrawlerError::config("At least one InfluxDB server is required"));
    }

    for server in &influx.servers {
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(CrawlerError::config(format!(
                "InfluxDB server '{}' must be an http:// or https:// URL",
                server
            )));
        }
    }

    if influx.org.is_empty() {
        return Err(CrawlerError::config("InfluxDB organization cannot be empty"));
    }

    if influx.bucket.is_empty() {
        return Err(CrawlerError::config("InfluxDB bucket cannot be empty"));
    }

    let schema = &influx.schema;
    if schema.measurement.is_empty() {
        return Err(CrawlerError::config("Measurement cannot be empty"));
    }

    if schema.timestamp_row.is_empty() {
        return Err(CrawlerError::config("Timestamp row cannot be empty"));
    }

    if !validate_layout(&schema.timestamp_layout) {
        return Err(CrawlerError::config(format!(
            "Invalid timestamp layout '{}'",
            schema.timestamp_layout
        )));
    }

    // Line protocol has no representation for a point without fields
    if schema.fields.is_empty() {
        return Err(CrawlerError::config("At least one field mapping is required"));
    }

    if influx.token.is_empty() {
        warn!("No InfluxDB token configured, writes will be unauthenticated");
    }

    Ok(())
}
