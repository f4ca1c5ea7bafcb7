//! Time-series sink
//!
//! Records are converted to points using the configured tag and field
//! mappings and written to one or more InfluxDB v2 endpoints.

use anyhow::Result;
use async_trait::async_trait;

use crate::decoder::Record;

pub mod influx;
pub mod mapping;
pub mod point;

pub use influx::{InfluxConfig, InfluxWriter, InfluxWriters};
pub use mapping::{FieldMapping, FieldType, MappingError, TagMapping};
pub use point::{FieldValue, Point, PointError, PointSchema};

/// Persists decoded records.
///
/// Shared by all ingestion tasks, so implementations must accept concurrent
/// calls.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Write every record or fail. Writing no records succeeds without
    /// contacting the backend.
    async fn write_records(&self, rows: &[Record]) -> Result<()>;
}
