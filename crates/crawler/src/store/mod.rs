//! Object store access
//!
//! The crawler needs four operations from a bucket: a full listing under a
//! prefix, reading an object, writing a (marker) object and deleting one.
//! [`S3Store`] talks to S3 or any S3-compatible endpoint, [`MemoryStore`]
//! keeps everything in process.

use anyhow::Result;
use async_trait::async_trait;
use crawler_common::ObjectRef;

pub mod config;
pub mod memory;
pub mod s3;

pub use config::StoreConfig;
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Bucket operations used by the crawler.
///
/// Implementations must be safe to share between concurrent tasks.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every object under `prefix`, following pagination until the
    /// listing is complete. Never returns a partial listing on success.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectRef>>;

    /// Read the full content of an object
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Create or replace an object
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
