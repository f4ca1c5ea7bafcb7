//! Error types for the crawler

use std::time::Duration;
use thiserror::Error;

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// The step of the per-object pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAction {
    Download,
    Decode,
    Write,
    Mark,
    Delete,
}

impl ObjectAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectAction::Download => "download",
            ObjectAction::Decode => "decode",
            ObjectAction::Write => "write",
            ObjectAction::Mark => "mark",
            ObjectAction::Delete => "delete",
        }
    }
}

impl std::fmt::Display for ObjectAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for a crawler invocation
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Missing or malformed option. Raised before any I/O happens.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The bucket could not be listed. No partial run is attempted.
    #[error("Unable to list objects under prefix '{prefix}': {source:#}")]
    Listing {
        prefix: String,
        #[source]
        source: anyhow::Error,
    },

    /// A single object failed somewhere in its download/decode/write/mark or
    /// delete chain.
    #[error("Failed to {action} object '{key}': {source:#}")]
    Object {
        key: String,
        action: ObjectAction,
        #[source]
        source: anyhow::Error,
    },

    /// The global deadline expired before the run completed.
    #[error("Timeout reached after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CrawlerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap a per-object failure
    pub fn object(
        key: impl Into<String>,
        action: ObjectAction,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Object {
            key: key.into(),
            action,
            source: source.into(),
        }
    }

    /// Key of the object this error is about, if any
    pub fn object_key(&self) -> Option<&str> {
        match self {
            CrawlerError::Object { key, .. } => Some(key),
            _ => None,
        }
    }
}
