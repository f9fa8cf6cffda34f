//! Tiered listing resolution
//!
//! Pages of records come from the fast store when it has them, and from the
//! ledger otherwise.
//!
//! ```text
//! list(params) → Fast store (indexed, possibly stale)
//!                   ↓ empty / error / timeout
//!                Ledger (authoritative, rate-limited)
//!                   totalSupply → id window → batch fetch
//! ```
//!
//! The tier is re-chosen on every call. The ledger path is best effort: it
//! can only enumerate ids, so it honors creation-order sorting and applies
//! search and author filters within the fetched page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ListingConfig;
use crate::error::{CoreError, Result};
use crate::fetch::{with_deadline, BatchFetcher};
use crate::traits::{FastStore, FastStoreQuery, FastStoreResponse, LedgerReader};
use crate::types::{ContentRecord, Listing, PageParams, RecordId, SortBy, SortOrder, SourceTier};

/// Listing resolution statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListingStats {
    /// Total `list` calls
    pub calls: u64,
    /// Calls answered by the fast store
    pub primary_hits: u64,
    /// Calls that fell through to the ledger
    pub fallbacks: u64,
    /// Calls that produced no records
    pub empty_results: u64,
    /// Calls that returned an error
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    calls: AtomicU64,
    primary_hits: AtomicU64,
    fallbacks: AtomicU64,
    empty_results: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ListingStats {
        ListingStats {
            calls: self.calls.load(Ordering::Relaxed),
            primary_hits: self.primary_hits.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            empty_results: self.empty_results.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Fast store first, ledger fallback
pub struct ListingResolver {
    fast_store: Arc<dyn FastStore>,
    ledger: Arc<dyn LedgerReader>,
    batch: BatchFetcher,
    config: ListingConfig,
    counters: Counters,
}

impl ListingResolver {
    pub fn new(
        fast_store: Arc<dyn FastStore>,
        ledger: Arc<dyn LedgerReader>,
        batch: BatchFetcher,
        config: ListingConfig,
    ) -> Self {
        Self {
            fast_store,
            ledger,
            batch,
            config,
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> ListingStats {
        self.counters.snapshot()
    }

    /// Resolve one page of records.
    pub async fn list(&self, params: &PageParams) -> Result<Listing> {
        Counters::bump(&self.counters.calls);

        let query = FastStoreQuery::from(params);
        let primary = with_deadline(
            self.config.fast_store_timeout,
            "fast store query",
            CoreError::FastStore,
            self.fast_store.query(&query),
        )
        .await;

        let primary_error = match primary {
            Ok(FastStoreResponse::Rows { rows, total_count }) if !rows.is_empty() => {
                let fetched = rows.len();
                let records = convert_rows(rows);
                if !records.is_empty() {
                    Counters::bump(&self.counters.primary_hits);
                    debug!(count = records.len(), total = total_count, "Listing served by fast store");
                    return Ok(Listing {
                        records,
                        total_count,
                        source: SourceTier::FastStore,
                    });
                }
                warn!(rows = fetched, page = params.page, "Fast store page has no usable rows");
                None
            }
            Ok(_) => {
                debug!(page = params.page, "Fast store has no rows for page");
                None
            }
            Err(e) => {
                warn!(error = %e, "Fast store query failed");
                Some(e)
            }
        };

        if !self.config.fallback_enabled {
            return match primary_error {
                Some(e) => {
                    Counters::bump(&self.counters.failures);
                    Err(e)
                }
                None => {
                    Counters::bump(&self.counters.empty_results);
                    Ok(Listing::empty())
                }
            };
        }

        Counters::bump(&self.counters.fallbacks);

        match self.list_from_ledger(params).await {
            Ok(listing) => {
                if listing.is_empty() {
                    Counters::bump(&self.counters.empty_results);
                }
                info!(
                    count = listing.records.len(),
                    total = listing.total_count,
                    "Listing served by ledger fallback"
                );
                Ok(listing)
            }
            Err(ledger_error) => match primary_error {
                Some(fast_store_error) => {
                    Counters::bump(&self.counters.failures);
                    warn!(
                        fast_store = %fast_store_error,
                        ledger = %ledger_error,
                        "Both listing tiers failed"
                    );
                    Err(ledger_error)
                }
                None => {
                    Counters::bump(&self.counters.empty_results);
                    warn!(error = %ledger_error, "Ledger fallback failed, returning empty listing");
                    Ok(Listing::empty())
                }
            },
        }
    }

    async fn list_from_ledger(&self, params: &PageParams) -> Result<Listing> {
        let total = with_deadline(
            self.config.ledger_timeout,
            "totalSupply",
            CoreError::Ledger,
            self.ledger.total_supply(),
        )
        .await?;

        if params.sort_by != SortBy::CreatedAt {
            debug!(sort_by = ?params.sort_by, "Ledger fallback lists newest first");
        }

        let ids = id_window(total, params);
        debug!(total = total, ids = ids.len(), "Fetching page from ledger");

        let records = self
            .batch
            .fetch_batch(&ids)
            .await
            .into_iter()
            .flatten()
            .filter(|record| matches_filters(record, params))
            .collect();

        Ok(Listing {
            records,
            total_count: total,
            source: SourceTier::Ledger,
        })
    }
}

fn convert_rows(rows: Vec<crate::types::CacheRecord>) -> Vec<ContentRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.token_id;
            let record = row.into_content_record();
            if record.is_none() {
                debug!(id = %id, "Skipping incomplete fast store row");
            }
            record
        })
        .collect()
}

/// Ids on the requested page, in display order.
///
/// Newest first: `high = total - (page-1)*size`, `low = max(high-size+1, 1)`.
/// Ascending creation order takes the window from the low end instead.
pub fn id_window(total_supply: u64, params: &PageParams) -> Vec<RecordId> {
    let size = u64::from(params.page_size);
    if size == 0 || total_supply == 0 {
        return Vec::new();
    }

    let offset = u64::from(params.page.max(1) - 1).saturating_mul(size);
    if offset >= total_supply {
        return Vec::new();
    }

    let ascending = params.sort_by == SortBy::CreatedAt && params.sort_order == SortOrder::Asc;

    if ascending {
        let low = offset + 1;
        let high = (offset + size).min(total_supply);
        (low..=high).map(RecordId).collect()
    } else {
        let high = total_supply - offset;
        let low = high.saturating_sub(size - 1).max(1);
        (low..=high).rev().map(RecordId).collect()
    }
}

fn matches_filters(record: &ContentRecord, params: &PageParams) -> bool {
    if let Some(needle) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = needle.to_lowercase();
        let hit = [
            &record.title,
            &record.description,
            &record.author_display_name,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }

    if let Some(author) = params.author.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let author = author.to_lowercase();
        if record.author_display_name.to_lowercase() != author
            && record.creator_address.to_lowercase() != author
        {
            return false;
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BatchConfig;
    use crate::fetch::RecordFetcher;
    use crate::testing::{cache_record, offline_gateway, InMemoryFastStore, InMemoryLedger};
    use std::time::Duration;

    fn resolver(
        store: Arc<InMemoryFastStore>,
        ledger: Arc<InMemoryLedger>,
        fallback_enabled: bool,
    ) -> ListingResolver {
        let fetcher = RecordFetcher::new(ledger.clone(), Arc::new(offline_gateway()), Duration::from_secs(5));
        let batch = BatchFetcher::new(
            fetcher,
            BatchConfig {
                concurrency: 3,
                chunk_interval: Duration::ZERO,
            },
        );
        let config = ListingConfig {
            fallback_enabled,
            fast_store_timeout: Duration::from_millis(500),
            ledger_timeout: Duration::from_secs(5),
        };
        ListingResolver::new(store, ledger, batch, config)
    }

    fn ids(listing: &Listing) -> Vec<u64> {
        listing.records.iter().map(|r| r.id.get()).collect()
    }

    #[test]
    fn test_id_window_newest_first() {
        let window = id_window(25, &PageParams::new(1, 10));
        assert_eq!(window.first(), Some(&RecordId(25)));
        assert_eq!(window.last(), Some(&RecordId(16)));

        let last_page = id_window(25, &PageParams::new(3, 10));
        assert_eq!(last_page, (1..=5).rev().map(RecordId).collect::<Vec<_>>());

        assert!(id_window(25, &PageParams::new(4, 10)).is_empty());
    }

    #[test]
    fn test_id_window_ascending() {
        let params = PageParams::new(2, 10).with_sort(SortBy::CreatedAt, SortOrder::Asc);
        assert_eq!(id_window(25, &params), (11..=20).map(RecordId).collect::<Vec<_>>());

        let params = PageParams::new(3, 10).with_sort(SortBy::CreatedAt, SortOrder::Asc);
        assert_eq!(id_window(25, &params), (21..=25).map(RecordId).collect::<Vec<_>>());
    }

    #[test]
    fn test_id_window_degenerate() {
        assert!(id_window(25, &PageParams::new(1, 0)).is_empty());
        assert!(id_window(0, &PageParams::new(1, 10)).is_empty());
        // page 0 is read as page 1
        assert_eq!(id_window(3, &PageParams::new(0, 10)).len(), 3);
        // other sort keys fall back to newest first
        let params = PageParams::new(1, 2).with_sort(SortBy::Title, SortOrder::Asc);
        assert_eq!(id_window(5, &params), vec![RecordId(5), RecordId(4)]);
    }

    #[tokio::test]
    async fn test_fast_store_rows_win() {
        let store = Arc::new(InMemoryFastStore::new().with_rows((1..=3).map(cache_record).collect()));
        let ledger = Arc::new(InMemoryLedger::with_records(10));
        let resolver = resolver(store, ledger.clone(), true);

        let listing = resolver.list(&PageParams::new(1, 10)).await.unwrap();
        assert_eq!(listing.source, SourceTier::FastStore);
        assert_eq!(ids(&listing), vec![1, 2, 3]);
        assert_eq!(listing.total_count, 3);
        assert_eq!(ledger.supply_calls(), 0);
    }

    #[tokio::test]
    async fn test_incomplete_rows_are_skipped() {
        let mut broken = cache_record(2);
        broken.metadata_uri = String::new();
        let store = Arc::new(InMemoryFastStore::new().with_rows(vec![cache_record(1), broken]));
        let resolver = resolver(store, Arc::new(InMemoryLedger::new()), true);

        let listing = resolver.list(&PageParams::default()).await.unwrap();
        assert_eq!(ids(&listing), vec![1]);
    }

    #[tokio::test]
    async fn test_page_without_usable_rows_falls_back_to_ledger() {
        let mut broken = cache_record(1);
        broken.metadata_uri = String::new();
        let store = Arc::new(InMemoryFastStore::new().with_rows(vec![broken]));
        let ledger = Arc::new(InMemoryLedger::with_records(5));
        let resolver = resolver(store, ledger, true);

        let listing = resolver.list(&PageParams::new(1, 3)).await.unwrap();
        assert_eq!(listing.source, SourceTier::Ledger);
        assert_eq!(ids(&listing), vec![5, 4, 3]);
        assert_eq!(resolver.stats().primary_hits, 0);
        assert_eq!(resolver.stats().fallbacks, 1);
    }

    #[tokio::test]
    async fn test_empty_store_falls_back_to_ledger() {
        let store = Arc::new(InMemoryFastStore::new());
        let ledger = Arc::new(InMemoryLedger::with_records(25));
        let resolver = resolver(store, ledger, true);

        let listing = resolver.list(&PageParams::new(1, 10)).await.unwrap();
        assert_eq!(listing.source, SourceTier::Ledger);
        assert_eq!(listing.total_count, 25);
        assert_eq!(ids(&listing), (16..=25).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_failing_store_falls_back_to_ledger() {
        let store = Arc::new(InMemoryFastStore::new().failing());
        let resolver = resolver(store, Arc::new(InMemoryLedger::with_records(2)), true);

        let listing = resolver.list(&PageParams::new(1, 10)).await.unwrap();
        assert_eq!(ids(&listing), vec![2, 1]);
        assert_eq!(resolver.stats().fallbacks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_falls_back_to_ledger() {
        let store = Arc::new(
            InMemoryFastStore::new()
                .with_rows(vec![cache_record(1)])
                .with_delay(Duration::from_secs(10)),
        );
        let resolver = resolver(store, Arc::new(InMemoryLedger::with_records(4)), true);

        let listing = resolver.list(&PageParams::new(1, 2)).await.unwrap();
        assert_eq!(listing.source, SourceTier::Ledger);
        assert_eq!(ids(&listing), vec![4, 3]);
    }

    #[tokio::test]
    async fn test_fallback_disabled() {
        let ledger = Arc::new(InMemoryLedger::with_records(5));

        let empty = resolver(Arc::new(InMemoryFastStore::new()), ledger.clone(), false);
        let listing = empty.list(&PageParams::default()).await.unwrap();
        assert!(listing.is_empty());
        assert_eq!(listing.source, SourceTier::Empty);

        let failing = resolver(Arc::new(InMemoryFastStore::new().failing()), ledger.clone(), false);
        let err = failing.list(&PageParams::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::FastStore(_)));

        assert_eq!(ledger.supply_calls(), 0);
    }

    #[tokio::test]
    async fn test_supply_failure_after_empty_store_is_empty() {
        let ledger = Arc::new(InMemoryLedger::with_records(5).failing_supply());
        let resolver = resolver(Arc::new(InMemoryFastStore::new()), ledger, true);

        let listing = resolver.list(&PageParams::default()).await.unwrap();
        assert!(listing.is_empty());
        assert_eq!(resolver.stats().empty_results, 1);
    }

    #[tokio::test]
    async fn test_both_tiers_failing_is_ledger_error() {
        let ledger = Arc::new(InMemoryLedger::with_records(5).failing_supply());
        let resolver = resolver(Arc::new(InMemoryFastStore::new().failing()), ledger, true);

        let err = resolver.list(&PageParams::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::Ledger(_)));
        assert_eq!(resolver.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_ledger_page_skips_missing_records() {
        // supply says 7 but id 7 was never stored, and id 3 fails to read
        let ledger = Arc::new(
            InMemoryLedger::with_records(6)
                .failing_record(RecordId(3))
                .with_total_supply(7),
        );
        let resolver = resolver(Arc::new(InMemoryFastStore::new()), ledger, true);

        let listing = resolver.list(&PageParams::new(1, 5)).await.unwrap();
        assert_eq!(ids(&listing), vec![6, 5, 4]);
        assert_eq!(listing.total_count, 7);
    }

    #[tokio::test]
    async fn test_ledger_page_filters() {
        let ledger = Arc::new(InMemoryLedger::with_records(12));
        let resolver = resolver(Arc::new(InMemoryFastStore::new()), ledger, true);

        let params = PageParams::new(1, 12).with_search("#1");
        let listing = resolver.list(&params).await.unwrap();
        assert_eq!(ids(&listing), vec![12, 11, 10, 1]);

        let params = PageParams::new(1, 12).with_author("author 7");
        let listing = resolver.list(&params).await.unwrap();
        assert_eq!(ids(&listing), vec![7]);

        let params = PageParams::new(1, 12).with_author(format!("0x{:040X}", 9));
        let listing = resolver.list(&params).await.unwrap();
        assert_eq!(ids(&listing), vec![9]);
    }

    #[tokio::test]
    async fn test_stats_track_tiers() {
        let store = Arc::new(InMemoryFastStore::new().with_rows(vec![cache_record(1)]));
        let resolver = resolver(store.clone(), Arc::new(InMemoryLedger::with_records(3)), true);

        resolver.list(&PageParams::default()).await.unwrap();
        store.set_failing(true);
        resolver.list(&PageParams::default()).await.unwrap();

        let stats = resolver.stats();
        assert_eq!(stats.calls, 2);
        assert_eq!(stats.primary_hits, 1);
        assert_eq!(stats.fallbacks, 1);
        assert_eq!(stats.failures, 0);
    }
}
