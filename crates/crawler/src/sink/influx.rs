use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{header, Client};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

use super::point::{to_points, PointSchema};
use super::RecordSink;
use crate::decoder::Record;

/// Per-request timeout for InfluxDB writes
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 30;

/// Where and how to write points
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Base URLs, one writer per entry
    pub servers: Vec<String>,
    pub token: String,
    pub org: String,
    pub bucket: String,
    pub schema: PointSchema,
}

/// Writes to a single InfluxDB v2 endpoint
#[derive(Clone)]
pub struct InfluxWriter {
    client: Client,
    server: String,
    token: String,
    org: String,
    bucket: String,
    schema: PointSchema,
}

impl InfluxWriter {
    pub fn new(server: &str, config: &InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_WRITE_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
            schema: config.schema.clone(),
        })
    }

    fn write_url(&self) -> String {
        format!("{}/api/v2/write", self.server)
    }
}

impl fmt::Debug for InfluxWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxWriter")
            .field("server", &self.server)
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .field("measurement", &self.schema.measurement)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordSink for InfluxWriter {
    #[instrument(skip(self, rows), fields(server = %self.server, rows = rows.len()))]
    async fn write_records(&self, rows: &[Record]) -> Result<()> {
        let points = to_points(rows, &self.schema).context("Failed to convert rows to points")?;
        if points.is_empty() {
            return Ok(());
        }

        let body = points
            .iter()
            .map(|p| p.to_line())
            .collect::<Vec<_>>()
            .join("\n");

        let response = self
            .client
            .post(self.write_url())
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(header::AUTHORIZATION, format!("Token {}", self.token))
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach InfluxDB at {}", self.server))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "InfluxDB at {} rejected write with status {}: {}",
                self.server,
                status,
                text.trim()
            );
        }

        debug!(points = points.len(), "Wrote points");
        Ok(())
    }
}

/// Fans each write out to every configured endpoint.
///
/// Writes run concurrently. The first endpoint to fail fails the whole write;
/// the remaining requests are dropped.
#[derive(Debug, Clone)]
pub struct InfluxWriters {
    writers: Vec<InfluxWriter>,
}

impl InfluxWriters {
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let writers = config
            .servers
            .iter()
            .map(|server| InfluxWriter::new(server, config))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { writers })
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

#[async_trait]
impl RecordSink for InfluxWriters {
    async fn write_records(&self, rows: &[Record]) -> Result<()> {
        try_join_all(self.writers.iter().map(|w| w.write_records(rows))).await?;
        Ok(())
    }
}
