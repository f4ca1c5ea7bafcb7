//! Bucket Crawler Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging setup, and error handling for the crawler workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CrawlerError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: [`ObjectRef`], the listing snapshot every component works on
//!
//! # Example
//!
//! ```no_run
//! use crawler_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     info!("crawler starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CrawlerError, ObjectAction, Result};
pub use types::ObjectRef;
