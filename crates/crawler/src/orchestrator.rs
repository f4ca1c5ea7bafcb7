//! Crawl orchestration
//!
//! One run goes through these phases in order, each finishing before the
//! next starts:
//!
//! 1. list every object under the prefix
//! 2. classify the listing (see [`crate::reconcile`])
//! 3. ingest unprocessed objects: download, decode, write, then put a marker
//! 4. if cleanup is enabled, delete processed objects that are old enough and
//!    outside the retained windows, then their markers
//! 5. if cleanup is enabled, delete orphan markers that are old enough
//!
//! The first per-object failure aborts the phase it happens in and becomes
//! the error of the run. The whole run is bounded by the configured timeout.

use chrono::Utc;
use crawler_common::{CrawlerError, ObjectAction, ObjectRef, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::CrawlConfig;
use crate::decoder::RecordDecoder;
use crate::reconcile::{classify, marker_key};
use crate::retention::split_by_windows;
use crate::runner::{RunStats, TaskRunner};
use crate::sink::RecordSink;
use crate::store::ObjectStore;

/// Content of a marker object. Only its presence matters.
pub const MARKER_CONTENT: &[u8] = &[0];

/// Outcome of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Objects returned by the listing
    pub listed: usize,
    /// True when nothing in the listing matched the configured suffixes
    pub no_op: bool,
    /// Data objects written to the sink and marked
    pub ingested: usize,
    /// Processed objects deleted together with their marker
    pub cleaned: usize,
    /// Orphan markers deleted
    pub orphans_removed: usize,
    /// Processed objects kept because they fall in a retained window
    pub retained: usize,
    /// Processed objects kept because their window folder does not parse
    pub unwindowed: usize,
    /// Cleanup candidates kept because they are not old enough yet
    pub too_young: usize,
    pub elapsed: Duration,
}

/// Runs crawls against one bucket
pub struct Crawler {
    config: CrawlConfig,
    store: Arc<dyn ObjectStore>,
    decoder: Arc<dyn RecordDecoder>,
    sink: Arc<dyn RecordSink>,
    shutdown: CancellationToken,
}

impl Crawler {
    pub fn new(
        config: CrawlConfig,
        store: Arc<dyn ObjectStore>,
        decoder: Arc<dyn RecordDecoder>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            config,
            store,
            decoder,
            sink,
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie the run to an external token, e.g. one cancelled on Ctrl-C
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Run one crawl under the configured deadline.
    ///
    /// On timeout the in-flight work is dropped and
    /// [`CrawlerError::Timeout`] is returned.
    #[instrument(skip(self), fields(prefix = %self.config.prefix))]
    pub async fn run(&self) -> Result<RunSummary> {
        let start = Instant::now();
        let token = self.shutdown.child_token();

        match tokio::time::timeout(self.config.timeout, self.crawl(&token, start)).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                Err(CrawlerError::Timeout(self.config.timeout))
            }
        }
    }

    async fn crawl(&self, token: &CancellationToken, start: Instant) -> Result<RunSummary> {
        let config = &self.config;

        let objects = self
            .store
            .list(&config.prefix)
            .await
            .map_err(|source| CrawlerError::Listing {
                prefix: config.prefix.clone(),
                source,
            })?;

        let classification = classify(&objects, &config.data_suffix, &config.marker_suffix);
        info!(
            listed = objects.len(),
            unprocessed = classification.unprocessed.len(),
            processed = classification.processed.len(),
            orphan_markers = classification.orphan_markers.len(),
            "Classified bucket content"
        );

        let mut summary = RunSummary {
            listed: objects.len(),
            ..RunSummary::default()
        };

        if classification.is_empty() {
            summary.no_op = true;
            summary.elapsed = start.elapsed();
            info!(
                elapsed = ?summary.elapsed,
                "No objects matching bucket / prefix, processing done"
            );
            return Ok(summary);
        }

        if !classification.unprocessed.is_empty() {
            let stats = self
                .run_phase(token, classification.unprocessed, |object| self.ingest_object(object))
                .await?;
            summary.ingested = stats.succeeded;
        }

        if config.clean_objects {
            let now = Utc::now();

            let split = split_by_windows(
                &classification.processed,
                config.windows_to_retain,
                &config.window_layout,
            );
            summary.retained = split.retained.len();
            summary.unwindowed = split.unwindowed.len();

            let (old, young): (Vec<_>, Vec<_>) = split
                .eligible
                .into_iter()
                .partition(|o| o.is_older_than(config.max_object_age, now));
            let (old_orphans, young_orphans): (Vec<_>, Vec<_>) = classification
                .orphan_markers
                .into_iter()
                .partition(|o| o.is_older_than(config.max_object_age, now));
            summary.too_young = young.len() + young_orphans.len();

            if !old.is_empty() {
                let stats = self
                    .run_phase(token, old, |object| self.clean_object(object))
                    .await?;
                summary.cleaned = stats.succeeded;
            }

            if !old_orphans.is_empty() {
                let stats = self
                    .run_phase(token, old_orphans, |object| self.remove_orphan(object))
                    .await?;
                summary.orphans_removed = stats.succeeded;
            }
        } else {
            debug!("Object cleanup disabled");
        }

        summary.elapsed = start.elapsed();
        info!(
            elapsed = ?summary.elapsed,
            ingested = summary.ingested,
            cleaned = summary.cleaned,
            orphans_removed = summary.orphans_removed,
            retained = summary.retained,
            unwindowed = summary.unwindowed,
            too_young = summary.too_young,
            "Processing ended"
        );

        Ok(summary)
    }

    async fn run_phase<F, Fut>(
        &self,
        token: &CancellationToken,
        objects: Vec<ObjectRef>,
        task: F,
    ) -> Result<RunStats>
    where
        F: Fn(ObjectRef) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let runner = TaskRunner::new(self.config.max_concurrency, token);
        let stats = runner.run_all(objects, |object, _token| task(object)).await?;

        if stats.skipped > 0 {
            return Err(CrawlerError::Other(anyhow::anyhow!(
                "Run cancelled with {} objects left unprocessed",
                stats.skipped
            )));
        }

        Ok(stats)
    }

    async fn ingest_object(&self, object: ObjectRef) -> Result<()> {
        info!(
            object = %object.key,
            last_modified = %object.last_modified,
            size = object.size,
            "Processing object"
        );

        let data = self
            .store
            .get(&object.key)
            .await
            .map_err(|e| failure(&object, ObjectAction::Download, e))?;

        let records = self
            .decoder
            .decode(&data)
            .map_err(|e| failure(&object, ObjectAction::Decode, e))?;

        self.sink
            .write_records(&records)
            .await
            .map_err(|e| failure(&object, ObjectAction::Write, e))?;

        let marker = marker_key(&object.key, &self.config.data_suffix, &self.config.marker_suffix)
            .ok_or_else(|| {
                failure(
                    &object,
                    ObjectAction::Mark,
                    anyhow::anyhow!("key does not end with '{}'", self.config.data_suffix),
                )
            })?;

        self.store
            .put(&marker, MARKER_CONTENT.to_vec())
            .await
            .map_err(|e| failure(&object, ObjectAction::Mark, e))?;

        info!(
            object = %object.key,
            marker = %marker,
            records = records.len(),
            "Object ingested"
        );

        Ok(())
    }

    async fn clean_object(&self, object: ObjectRef) -> Result<()> {
        info!(
            object = %object.key,
            last_modified = %object.last_modified,
            size = object.size,
            "Cleaning object"
        );

        self.store
            .delete(&object.key)
            .await
            .map_err(|e| failure(&object, ObjectAction::Delete, e))?;

        if let Some(marker) =
            marker_key(&object.key, &self.config.data_suffix, &self.config.marker_suffix)
        {
            if marker != object.key {
                self.store.delete(&marker).await.map_err(|e| {
                    failure(&object, ObjectAction::Delete, e.context(format!("marker '{}'", marker)))
                })?;
            }
        }

        info!(object = %object.key, "Object cleaned");
        Ok(())
    }

    async fn remove_orphan(&self, object: ObjectRef) -> Result<()> {
        info!(
            object = %object.key,
            last_modified = %object.last_modified,
            size = object.size,
            "Removing orphan marker"
        );

        self.store
            .delete(&object.key)
            .await
            .map_err(|e| failure(&object, ObjectAction::Delete, e))?;

        info!(object = %object.key, "Orphan marker removed");
        Ok(())
    }
}

/// Log a per-object failure and turn it into the run error
fn failure(object: &ObjectRef, action: ObjectAction, source: impl Into<anyhow::Error>) -> CrawlerError {
    let source = source.into();
    error!(
        object = %object.key,
        last_modified = %object.last_modified,
        size = object.size,
        action = %action,
        error = %format!("{:#}", source),
        "Object action failed"
    );
    CrawlerError::object(object.key.clone(), action, source)
}
