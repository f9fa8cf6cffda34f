//! Bounded-concurrency batch fetch
//!
//! Ids are split into consecutive chunks of `concurrency`. Each chunk runs
//! fully concurrently and is awaited to completion before the next one
//! starts, with `chunk_interval` of idle time in between. Output order always
//! matches input order.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};

use super::record::RecordFetcher;
use crate::config::BatchConfig;
use crate::error::CoreError;
use crate::types::{ContentRecord, RecordId};

/// Run `op` over `items` in chunks of `concurrency`, pausing `interval`
/// between chunks. Results come back in input order.
///
/// A `concurrency` of 0 is treated as 1.
pub async fn run_chunked<I, T, F, Fut>(
    items: Vec<I>,
    concurrency: usize,
    interval: Duration,
    op: F,
) -> Vec<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = T>,
{
    let chunk_size = concurrency.max(1);
    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut remaining = items.into_iter().peekable();
    let mut chunk_index = 0usize;

    while remaining.peek().is_some() {
        let chunk: Vec<I> = remaining.by_ref().take(chunk_size).collect();
        debug!(chunk = chunk_index, size = chunk.len(), total = total, "Dispatching chunk");

        results.extend(join_all(chunk.into_iter().map(&op)).await);
        chunk_index += 1;

        if remaining.peek().is_some() && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    results
}

/// One failed position in a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    pub position: usize,
    pub id: RecordId,
    pub error: CoreError,
}

/// Batch result with a report of which positions failed
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// One slot per requested id, in request order
    pub results: Vec<Option<ContentRecord>>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Hydrated records in request order, gaps removed
    pub fn into_records(self) -> Vec<ContentRecord> {
        self.results.into_iter().flatten().collect()
    }
}

/// Fetches many records without tripping the ledger's rate limit
#[derive(Clone)]
pub struct BatchFetcher {
    fetcher: RecordFetcher,
    config: BatchConfig,
}

impl BatchFetcher {
    pub fn new(fetcher: RecordFetcher, config: BatchConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn record_fetcher(&self) -> &RecordFetcher {
        &self.fetcher
    }

    /// Fetch with the configured concurrency. Failed or missing ids are `None`.
    pub async fn fetch_batch(&self, ids: &[RecordId]) -> Vec<Option<ContentRecord>> {
        self.fetch_batch_with(ids, self.config.concurrency).await
    }

    /// Fetch with an explicit concurrency bound
    pub async fn fetch_batch_with(
        &self,
        ids: &[RecordId],
        concurrency: usize,
    ) -> Vec<Option<ContentRecord>> {
        self.fetch_batch_detailed(ids, concurrency).await.results
    }

    /// Fetch and report per-position failures alongside the results
    pub async fn fetch_batch_detailed(&self, ids: &[RecordId], concurrency: usize) -> BatchOutcome {
        if ids.is_empty() {
            return BatchOutcome::default();
        }

        let positioned: Vec<(usize, RecordId)> = ids.iter().copied().enumerate().collect();
        let settled = run_chunked(
            positioned,
            concurrency,
            self.config.chunk_interval,
            |(position, id)| async move { (position, id, self.fetcher.fetch_record(id).await) },
        )
        .await;

        let mut outcome = BatchOutcome {
            results: Vec::with_capacity(ids.len()),
            failures: Vec::new(),
        };

        for (position, id, result) in settled {
            match result {
                Ok(record) => outcome.results.push(record),
                Err(error) => {
                    warn!(id = %id, position = position, error = %error, "Record fetch failed");
                    outcome.results.push(None);
                    outcome.failures.push(BatchFailure {
                        position,
                        id,
                        error,
                    });
                }
            }
        }

        if outcome.is_partial() {
            warn!(
                failed = outcome.failures.len(),
                total = ids.len(),
                "Batch completed with failures"
            );
        }

        outcome
    }
}
