//! Ledger-backed record retrieval
//!
//! [`RecordFetcher`] hydrates a single record from the ledger plus its
//! content-addressed metadata. [`BatchFetcher`] runs many of those under a
//! fixed concurrency bound with a pause between chunks, because the ledger
//! rate-limits reads.

pub mod batch;
pub mod record;

pub use batch::{run_chunked, BatchFailure, BatchFetcher, BatchOutcome};
pub use record::RecordFetcher;

use std::future::Future;
use std::time::Duration;

use crate::error::{CoreError, Result};

/// Run a collaborator call under a deadline, mapping expiry through `on_timeout`.
pub(crate) async fn with_deadline<T, F>(
    limit: Duration,
    what: &str,
    on_timeout: fn(String) -> CoreError,
    call: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(format!("{} timed out after {:?}", what, limit))),
    }
}
