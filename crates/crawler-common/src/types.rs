//! Shared domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One object as seen by a bucket listing.
///
/// This is a snapshot: the object may have changed or disappeared by the time
/// it is acted upon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Full key within the bucket
    pub key: String,

    /// Last modification time reported by the store
    pub last_modified: DateTime<Utc>,

    /// Size in bytes
    pub size: u64,
}

impl ObjectRef {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            key: key.into(),
            last_modified,
            size,
        }
    }

    /// Time elapsed since the last modification. Objects dated in the future
    /// have zero age.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_modified).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the object is strictly older than `max_age`
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }

    /// Second-to-last `/`-separated segment of the key, i.e. the folder that
    /// directly contains the object. `None` for keys without a folder.
    pub fn window_segment(&self) -> Option<&str> {
        let mut segments = self.key.rsplit('/');
        let _file = segments.next()?;
        segments.next()
    }
}
