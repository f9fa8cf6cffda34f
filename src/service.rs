//! Wired-up entry point
//!
//! [`EvermarkCore`] owns one instance of every component, built from a
//! single [`CoreConfig`] and the injected collaborators.

use std::sync::Arc;

use tracing::info;

use crate::config::CoreConfig;
use crate::error::{CoreError, Result};
use crate::fetch::{BatchFetcher, BatchOutcome, RecordFetcher};
use crate::gateway::{ContentMetadata, GatewayResolver};
use crate::leaderboard::LeaderboardAggregator;
use crate::listing::{ListingResolver, ListingStats};
use crate::publish::{MetadataDraft, MetadataPublisher, PublishedMetadata};
use crate::traits::{DisabledUploadSink, FastStore, LedgerReader, NullFastStore, UploadSink};
use crate::types::{ContentRecord, CycleId, LeaderboardEntry, Listing, PageParams, RecordId};

/// Content resolution and leaderboard aggregation
pub struct EvermarkCore {
    config: CoreConfig,
    gateway: Arc<GatewayResolver>,
    batch: BatchFetcher,
    listing: ListingResolver,
    leaderboard: LeaderboardAggregator,
    publisher: MetadataPublisher,
}

impl EvermarkCore {
    pub fn builder() -> EvermarkCoreBuilder {
        EvermarkCoreBuilder::default()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn gateway(&self) -> &GatewayResolver {
        &self.gateway
    }

    /// Resolve a content-address URI to canonical metadata
    pub async fn resolve_metadata(&self, address: &str) -> Result<ContentMetadata> {
        self.gateway.resolve(address).await
    }

    pub async fn fetch_record(&self, id: RecordId) -> Result<Option<ContentRecord>> {
        self.batch.record_fetcher().fetch_record(id).await
    }

    pub async fn fetch_batch(&self, ids: &[RecordId]) -> Vec<Option<ContentRecord>> {
        self.batch.fetch_batch(ids).await
    }

    pub async fn fetch_batch_detailed(&self, ids: &[RecordId], concurrency: usize) -> BatchOutcome {
        self.batch.fetch_batch_detailed(ids, concurrency).await
    }

    pub async fn list(&self, params: &PageParams) -> Result<Listing> {
        self.listing.list(params).await
    }

    pub fn listing_stats(&self) -> ListingStats {
        self.listing.stats()
    }

    pub async fn leaderboard(&self, cycle: CycleId, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard.leaderboard(cycle, limit).await
    }

    pub async fn current_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        self.leaderboard.current_leaderboard(limit).await
    }

    pub async fn publish(&self, draft: MetadataDraft) -> Result<PublishedMetadata> {
        self.publisher.publish(draft).await
    }
}

/// Builder for [`EvermarkCore`]. Only the ledger is mandatory.
#[derive(Default)]
pub struct EvermarkCoreBuilder {
    config: Option<CoreConfig>,
    ledger: Option<Arc<dyn LedgerReader>>,
    fast_store: Option<Arc<dyn FastStore>>,
    upload_sink: Option<Arc<dyn UploadSink>>,
    gateway: Option<Arc<GatewayResolver>>,
    http_client: Option<reqwest::Client>,
}

impl EvermarkCoreBuilder {
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn LedgerReader>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn fast_store(mut self, fast_store: Arc<dyn FastStore>) -> Self {
        self.fast_store = Some(fast_store);
        self
    }

    pub fn upload_sink(mut self, sink: Arc<dyn UploadSink>) -> Self {
        self.upload_sink = Some(sink);
        self
    }

    /// Use a prebuilt resolver instead of one built from the gateway config
    pub fn gateway(mut self, gateway: Arc<GatewayResolver>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Share an HTTP client with the gateway resolver
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn build(self) -> Result<EvermarkCore> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let ledger = self
            .ledger
            .ok_or_else(|| CoreError::Config("a ledger reader is required".to_string()))?;
        let has_fast_store = self.fast_store.is_some();
        let has_sink = self.upload_sink.is_some();
        let fast_store = self.fast_store.unwrap_or_else(|| Arc::new(NullFastStore));
        let upload_sink = self
            .upload_sink
            .unwrap_or_else(|| Arc::new(DisabledUploadSink));

        let gateway = match (self.gateway, self.http_client) {
            (Some(gateway), _) => gateway,
            (None, Some(client)) => Arc::new(GatewayResolver::with_client(config.gateway.clone(), client)),
            (None, None) => Arc::new(GatewayResolver::new(config.gateway.clone())),
        };

        let fetcher = RecordFetcher::new(ledger.clone(), gateway.clone(), config.listing.ledger_timeout);
        let batch = BatchFetcher::new(fetcher, config.batch.clone());

        let listing = ListingResolver::new(
            fast_store.clone(),
            ledger.clone(),
            batch.clone(),
            config.listing.clone(),
        );

        let leaderboard = LeaderboardAggregator::new(
            fast_store,
            ledger,
            batch.clone(),
            config.leaderboard.clone(),
            config.listing.fast_store_timeout,
            config.listing.ledger_timeout,
        );

        let publisher = MetadataPublisher::new(upload_sink);

        info!(
            gateways = gateway.endpoints().len(),
            fast_store = has_fast_store,
            upload_sink = has_sink,
            concurrency = config.batch.concurrency,
            fallback = config.listing.fallback_enabled,
            "EvermarkCore initialized"
        );

        Ok(EvermarkCore {
            config,
            gateway,
            batch,
            listing,
            leaderboard,
            publisher,
        })
    }
}
