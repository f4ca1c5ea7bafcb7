//! Bounded parallel task runner
//!
//! Runs one task per item with at most `max_concurrency` in flight. The first
//! failure cancels the run token: tasks that have not started yet are
//! skipped, tasks already running finish normally and may watch the token
//! themselves. The first error is returned.

use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What happened to the items of one `run_all` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Tasks that ran to completion successfully
    pub succeeded: usize,
    /// Tasks that ran and failed
    pub failed: usize,
    /// Items never started because the run was cancelled
    pub skipped: usize,
}

enum Outcome<E> {
    Done(Result<(), E>),
    Skipped,
}

pub struct TaskRunner {
    max_concurrency: usize,
    token: CancellationToken,
}

impl TaskRunner {
    /// Create a runner whose token is a child of `parent`. Cancelling the
    /// parent (deadline, shutdown) cancels the run; a task failure does not
    /// propagate upwards.
    pub fn new(max_concurrency: usize, parent: &CancellationToken) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            token: parent.child_token(),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Run `task` over every item.
    ///
    /// Returns the first error observed, otherwise the run statistics. When
    /// the parent token is cancelled with no task failing, the remaining
    /// items are reported as skipped rather than as an error.
    pub async fn run_all<T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = T>,
        task: F,
    ) -> Result<RunStats, E>
    where
        F: Fn(T, CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        let task = &task;
        let mut outcomes = stream::iter(items)
            .map(|item| {
                let token = self.token.clone();
                async move {
                    if token.is_cancelled() {
                        return Outcome::Skipped;
                    }
                    Outcome::Done(task(item, token).await)
                }
            })
            .buffer_unordered(self.max_concurrency);

        let mut stats = RunStats::default();
        let mut first_error = None;

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Outcome::Done(Ok(())) => stats.succeeded += 1,
                Outcome::Done(Err(e)) => {
                    stats.failed += 1;
                    if first_error.is_none() {
                        self.token.cancel();
                        first_error = Some(e);
                    }
                }
                Outcome::Skipped => stats.skipped += 1,
            }
        }

        debug!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            skipped = stats.skipped,
            "Task run finished"
        );

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }
}
