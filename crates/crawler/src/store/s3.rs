use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{config::Credentials, primitives::ByteStream, types::Object, Client};
use chrono::{DateTime, Utc};
use crawler_common::ObjectRef;
use tracing::{debug, info, instrument};

use super::{ObjectStore, StoreConfig};

/// [`ObjectStore`] backed by S3 or an S3-compatible endpoint
#[derive(Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn new(config: StoreConfig) -> Result<Self> {
        debug!(
            region = %config.region,
            endpoint = ?config.endpoint,
            path_style = config.path_style,
            "Initializing S3 store"
        );

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "bucket-crawler",
            ));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.path_style)
            .build();

        info!("S3 store initialized for bucket: {}", config.bucket);

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket,
        })
    }
}

/// Continuation token for the page after `page`, or `None` once the listing
/// is complete. A truncated page without a token is an error: returning what
/// was read so far would make unlisted data objects look absent.
fn next_page_token(
    is_truncated: Option<bool>,
    next_token: Option<&str>,
    page: usize,
) -> Result<Option<String>> {
    if is_truncated != Some(true) {
        return Ok(None);
    }

    match next_token {
        Some(token) if !token.is_empty() => Ok(Some(token.to_string())),
        _ => bail!(
            "Listing truncated on page {} without a continuation token",
            page
        ),
    }
}

/// Convert a listing entry. Directory placeholders and keyless entries are
/// skipped. An entry without a modification time is dated `now` so it can
/// never look old enough for cleanup.
fn to_object_ref(obj: &Object, now: DateTime<Utc>) -> Option<ObjectRef> {
    let key = obj.key()?;
    if key.is_empty() || key.ends_with('/') {
        return None;
    }

    let last_modified = obj
        .last_modified()
        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
        .unwrap_or_else(|| {
            debug!(object = key, "Listing entry has no last-modified time");
            now
        });

    Some(ObjectRef {
        key: key.to_string(),
        last_modified,
        size: obj.size().unwrap_or(0).max(0) as u64,
    })
}

#[async_trait]
impl ObjectStore for S3Store {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectRef>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut req = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(ref token) = continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req
                .send()
                .await
                .with_context(|| format!("ListObjectsV2 failed on page {}", pages + 1))?;
            pages += 1;

            let now = Utc::now();
            objects.extend(resp.contents().iter().filter_map(|obj| to_object_ref(obj, now)));

            continuation_token =
                next_page_token(resp.is_truncated(), resp.next_continuation_token(), pages)?;
            if continuation_token.is_none() {
                break;
            }
        }

        debug!(pages, object_count = objects.len(), "Listed prefix");

        Ok(objects)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to download from S3: {}", key))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from s3://{}/{}", data.len(), self.bucket, key);

        Ok(data)
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, size = data.len()))]
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .with_context(|| format!("Failed to upload to S3: {}", key))?;

        debug!("Uploaded s3://{}/{}", self.bucket, key);

        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete from S3: {}", key))?;

        debug!("Deleted s3://{}/{}", self.bucket, key);

        Ok(())
    }
}
