//! Command-line interface
//!
//! Every option can also come from the environment (a `.env` file is loaded
//! by the binary before parsing). Durations use humantime syntax such as
//! `30s`, `10m` or `1h 30m`.

use clap::Parser;
use crawler_common::logging::{LogConfig, LogLevel};
use crawler_common::{CrawlerError, Result};
use std::time::Duration;

use crate::config::{
    CrawlConfig, CrawlerConfig, DEFAULT_MARKER_SUFFIX, DEFAULT_REGION, DEFAULT_TIMESTAMP_LAYOUT,
    DEFAULT_TIMESTAMP_ROW, DEFAULT_WINDOW_LAYOUT,
};
use crate::sink::{FieldMapping, InfluxConfig, PointSchema, TagMapping};
use crate::store::StoreConfig;

/// Ingest CSV objects from an S3 bucket into InfluxDB
#[derive(Parser, Debug)]
#[command(name = "bucket-crawler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// AWS region of the bucket
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// Custom S3 endpoint (MinIO, LocalStack)
    #[arg(long, env = "CRAWLER_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "CRAWLER_S3_PATH_STYLE")]
    pub path_style: bool,

    /// Static access key; the default AWS credential chain is used otherwise
    #[arg(long, env = "CRAWLER_S3_ACCESS_KEY", requires = "secret_key")]
    pub access_key: Option<String>,

    /// Static secret key
    #[arg(long, env = "CRAWLER_S3_SECRET_KEY", hide_env_values = true, requires = "access_key")]
    pub secret_key: Option<String>,

    /// Bucket to watch
    #[arg(long, env = "CRAWLER_BUCKET")]
    pub bucket: String,

    /// Only objects under this prefix are considered
    #[arg(long, env = "CRAWLER_PREFIX", default_value = "")]
    pub prefix: String,

    /// Suffix of the data objects to ingest
    #[arg(long, env = "CRAWLER_SUFFIX", default_value = "")]
    pub suffix: String,

    /// Suffix replacing the data suffix to name marker objects
    #[arg(long, env = "CRAWLER_PROCESSED_FLAG_SUFFIX", default_value = DEFAULT_MARKER_SUFFIX)]
    pub processed_flag_suffix: String,

    /// Delete processed objects (and orphan markers) once old enough
    #[arg(long, env = "CRAWLER_CLEAN_OBJECTS")]
    pub clean_objects: bool,

    /// Minimum age before an object may be cleaned
    #[arg(long = "s3-max-file-age", env = "CRAWLER_S3_MAX_FILE_AGE", default_value = "10m", value_parser = humantime::parse_duration)]
    pub s3_max_file_age: Duration,

    /// Number of most recent window folders protected from cleanup (0 disables)
    #[arg(long, env = "CRAWLER_WINDOWS_TO_RETAIN", default_value_t = 0)]
    pub windows_to_retain: usize,

    /// strftime layout of window folder names
    #[arg(long, env = "CRAWLER_WINDOW_LAYOUT", default_value = DEFAULT_WINDOW_LAYOUT)]
    pub window_layout: String,

    /// Deadline for the whole run
    #[arg(long, env = "CRAWLER_TIMEOUT", default_value = "30s", value_parser = humantime::parse_duration)]
    pub timeout: Duration,

    /// Maximum number of objects handled at once
    #[arg(long, env = "CRAWLER_MAX_CONCURRENCY", default_value_t = crate::config::DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// InfluxDB server URL; repeat to write to several servers
    #[arg(long = "influx-server", env = "CRAWLER_INFLUX_SERVERS", value_delimiter = ',', required = true)]
    pub influx_servers: Vec<String>,

    /// InfluxDB API token
    #[arg(long, env = "CRAWLER_INFLUX_TOKEN", hide_env_values = true, default_value = "")]
    pub influx_token: String,

    /// InfluxDB organization
    #[arg(long, env = "CRAWLER_INFLUX_ORG", default_value = "")]
    pub influx_org: String,

    /// InfluxDB bucket
    #[arg(long, env = "CRAWLER_INFLUX_BUCKET", default_value = "")]
    pub influx_bucket: String,

    /// Measurement of the written points
    #[arg(long, env = "CRAWLER_MEASUREMENT", default_value = "")]
    pub measurement: String,

    /// Column holding the point timestamp
    #[arg(long, env = "CRAWLER_TIMESTAMP_ROW", default_value = DEFAULT_TIMESTAMP_ROW)]
    pub timestamp_row: String,

    /// strftime layout of the timestamp column
    #[arg(long, env = "CRAWLER_TIMESTAMP_LAYOUT", default_value = DEFAULT_TIMESTAMP_LAYOUT)]
    pub timestamp_layout: String,

    /// Tag mapping `name[={row:column}]`; repeatable
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<TagMapping>,

    /// Field mapping `name={type:float|int|string|bool[,row:column]}`; repeatable
    #[arg(long = "field", value_name = "FIELD")]
    pub fields: Vec<FieldMapping>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Logging setup for this invocation. `CRAWLER_LOG_*` variables still
    /// take precedence.
    pub fn log_config(&self) -> Result<LogConfig> {
        let level = if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        };

        Ok(LogConfig::builder().level(level).build().merge_env()?)
    }
}

impl TryFrom<Cli> for CrawlerConfig {
    type Error = CrawlerError;

    fn try_from(cli: Cli) -> Result<Self> {
        let config = CrawlerConfig {
            store: StoreConfig {
                endpoint: cli.endpoint.filter(|e| !e.is_empty()),
                region: cli.region,
                bucket: cli.bucket,
                access_key: cli.access_key,
                secret_key: cli.secret_key,
                path_style: cli.path_style,
            },
            influx: InfluxConfig {
                servers: cli.influx_servers,
                token: cli.influx_token,
                org: cli.influx_org,
                bucket: cli.influx_bucket,
                schema: PointSchema {
                    measurement: cli.measurement,
                    timestamp_row: cli.timestamp_row,
                    timestamp_layout: cli.timestamp_layout,
                    tags: cli.tags,
                    fields: cli.fields,
                },
            },
            crawl: CrawlConfig {
                prefix: cli.prefix,
                data_suffix: cli.suffix,
                marker_suffix: cli.processed_flag_suffix,
                clean_objects: cli.clean_objects,
                max_object_age: cli.s3_max_file_age,
                windows_to_retain: cli.windows_to_retain,
                window_layout: cli.window_layout,
                timeout: cli.timeout,
                max_concurrency: cli.max_concurrency,
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::sink::FieldType;

    fn parse(extra: &[&str]) -> std::result::Result<Cli, clap::Error> {
        let mut args = vec![
            "bucket-crawler",
            "--region",
            "eu-west-1",
            "--bucket",
            "metrics",
            "--influx-server",
            "http://localhost:8086",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args)
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.processed_flag_suffix, "processed");
        assert_eq!(cli.s3_max_file_age, Duration::from_secs(600));
        assert_eq!(cli.timeout, Duration::from_secs(30));
        assert_eq!(cli.windows_to_retain, 0);
        assert_eq!(cli.timestamp_row, "timestamp");
        assert_eq!(cli.timestamp_layout, "%Y-%m-%dT%H:%M:%S%.3fZ");
        assert!(!cli.clean_objects);
        assert!(cli.tags.is_empty());
    }

    #[test]
    fn test_bucket_and_server_are_required() {
        assert!(Cli::try_parse_from(["bucket-crawler", "--influx-server", "http://x"]).is_err());
        assert!(Cli::try_parse_from(["bucket-crawler", "--bucket", "b"]).is_err());
    }

    #[test]
    fn test_repeatable_options() {
        let cli = parse(&[
            "--influx-server",
            "http://other:8086",
            "--tag",
            "pp={row:publishing_point}",
            "--tag",
            "region",
            "--field",
            "audience={type:int}",
        ])
        .unwrap();

        assert_eq!(cli.influx_servers.len(), 2);
        assert_eq!(
            cli.tags,
            vec![
                TagMapping::new("pp", "publishing_point"),
                TagMapping::new("region", "region")
            ]
        );
        assert_eq!(
            cli.fields,
            vec![FieldMapping::new("audience", "audience", FieldType::Integer)]
        );
    }

    #[test]
    fn test_invalid_mapping_is_a_parse_error() {
        assert!(parse(&["--tag", "foo=%"]).is_err());
        assert!(parse(&["--field", "foo={type:decimal}"]).is_err());
    }

    #[test]
    fn test_durations() {
        let cli = parse(&["--timeout", "2m", "--s3-max-file-age", "1h 30m"]).unwrap();
        assert_eq!(cli.timeout, Duration::from_secs(120));
        assert_eq!(cli.s3_max_file_age, Duration::from_secs(5400));
        assert!(parse(&["--timeout", "soon"]).is_err());
    }

    #[test]
    fn test_into_config() {
        let cli = parse(&[
            "--suffix",
            ".csv",
            "--processed-flag-suffix",
            ".csv.processed",
            "--measurement",
            "audience",
            "--influx-org",
            "acme",
            "--influx-bucket",
            "raw",
            "--field",
            "audience={type:int}",
            "--clean-objects",
            "--windows-to-retain",
            "3",
        ])
        .unwrap();

        let config = CrawlerConfig::try_from(cli).unwrap();
        assert_eq!(config.store.bucket, "metrics");
        assert_eq!(config.store.region, "eu-west-1");
        assert_eq!(config.crawl.data_suffix, ".csv");
        assert_eq!(config.crawl.marker_suffix, ".csv.processed");
        assert!(config.crawl.clean_objects);
        assert_eq!(config.crawl.windows_to_retain, 3);
        assert_eq!(config.influx.schema.measurement, "audience");
        assert_eq!(config.influx.org, "acme");
        assert_eq!(config.influx.bucket, "raw");
    }

    #[test]
    fn test_into_config_validates() {
        // No measurement
        let cli = parse(&["--field", "audience={type:int}"]).unwrap();
        assert!(matches!(
            CrawlerConfig::try_from(cli),
            Err(CrawlerError::Config(_))
        ));

        // No InfluxDB organization or bucket
        let cli = parse(&["--measurement", "audience", "--field", "audience={type:int}"]).unwrap();
        assert!(matches!(
            CrawlerConfig::try_from(cli),
            Err(CrawlerError::Config(_))
        ));
    }

    #[test]
    fn test_credentials_come_in_pairs() {
        assert!(parse(&["--access-key", "ak"]).is_err());
        let cli = parse(&["--access-key", "ak", "--secret-key", "sk"]).unwrap();
        assert_eq!(cli.secret_key.as_deref(), Some("sk"));
    }

    #[test]
    fn test_verbose_log_level() {
        let cli = parse(&["-v"]).unwrap();
        assert!(cli.verbose);
    }
}
