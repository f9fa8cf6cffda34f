//! Single record hydration

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::with_deadline;
use crate::error::{CoreError, Result};
use crate::gateway::GatewayResolver;
use crate::traits::LedgerReader;
use crate::types::{ContentRecord, RecordId};

/// Builds a [`ContentRecord`] from the ledger tuple and resolved metadata
#[derive(Clone)]
pub struct RecordFetcher {
    ledger: Arc<dyn LedgerReader>,
    gateway: Arc<GatewayResolver>,
    ledger_timeout: Duration,
}

impl RecordFetcher {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        gateway: Arc<GatewayResolver>,
        ledger_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            gateway,
            ledger_timeout,
        }
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerReader> {
        &self.ledger
    }

    /// Fetch one record.
    ///
    /// `Ok(None)` when the id was never minted or the ledger tuple lacks a
    /// title or content address. Ledger failures and timeouts are errors;
    /// metadata failures only leave the optional fields empty.
    pub async fn fetch_record(&self, id: RecordId) -> Result<Option<ContentRecord>> {
        let exists = with_deadline(
            self.ledger_timeout,
            "exists",
            CoreError::Ledger,
            self.ledger.exists(id),
        )
        .await?;

        if !exists {
            debug!(id = %id, "Record not minted");
            return Ok(None);
        }

        let core = with_deadline(
            self.ledger_timeout,
            "record",
            CoreError::Ledger,
            self.ledger.record(id),
        )
        .await?;

        if core.title.trim().is_empty() || core.content_uri.trim().is_empty() {
            warn!(id = %id, "Ledger record missing title or content address, skipping");
            return Ok(None);
        }

        let metadata = self.gateway.resolve_or_default(&core.content_uri).await;

        Ok(Some(ContentRecord {
            id,
            title: core.title,
            author_display_name: core.creator,
            creator_address: core.minter,
            description: metadata.description,
            source_url: metadata.source_url,
            image_url: self.gateway.image_url(&metadata.image),
            content_address_uri: core.content_uri,
            created_at: core.created_at,
            referrer: core.referrer.filter(|r| !r.is_empty()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::testing::{ledger_record, offline_gateway, InMemoryLedger, SAMPLE_CID};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(ledger: InMemoryLedger, gateway: GatewayResolver) -> RecordFetcher {
        RecordFetcher::new(Arc::new(ledger), Arc::new(gateway), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_unminted_id_is_none() {
        let fetcher = fetcher(InMemoryLedger::with_records(3), offline_gateway());
        assert!(fetcher.fetch_record(RecordId(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_title_is_none() {
        let mut core = ledger_record(1);
        core.title = String::new();
        let ledger = InMemoryLedger::new().with_record(RecordId(1), core);

        let fetcher = fetcher(ledger, offline_gateway());
        assert!(fetcher.fetch_record(RecordId(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ledger_failure_propagates() {
        let ledger = InMemoryLedger::with_records(2).failing_record(RecordId(2));
        let fetcher = fetcher(ledger, offline_gateway());

        let err = fetcher.fetch_record(RecordId(2)).await.unwrap_err();
        assert!(matches!(err, CoreError::Ledger(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ledger_times_out() {
        let ledger = InMemoryLedger::with_records(1).with_delay(Duration::from_secs(5));
        let fetcher = fetcher(ledger, offline_gateway());

        let err = fetcher.fetch_record(RecordId(1)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unresolvable_metadata_keeps_core_fields() {
        let fetcher = fetcher(InMemoryLedger::with_records(1), offline_gateway());
        let record = fetcher.fetch_record(RecordId(1)).await.unwrap().unwrap();

        assert_eq!(record.title, "Evermark #1");
        assert_eq!(record.author_display_name, "Author 1");
        assert_eq!(record.creator_address, "0x0000000000000000000000000000000000000001");
        assert_eq!(record.description, "");
        assert_eq!(record.image_url, "");
    }

    #[tokio::test]
    async fn test_metadata_is_merged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/ipfs/{}", SAMPLE_CID)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "description": "a long read",
                "sourceUrl": "https://example.com/read",
                "image": format!("ipfs://{}", SAMPLE_CID),
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = GatewayResolver::new(GatewayConfig::new(vec![server.uri()]));
        let fetcher = fetcher(InMemoryLedger::with_records(1), gateway);
        let record = fetcher.fetch_record(RecordId(1)).await.unwrap().unwrap();

        assert_eq!(record.description, "a long read");
        assert_eq!(record.source_url, "https://example.com/read");
        assert_eq!(record.image_url, format!("{}/ipfs/{}", server.uri(), SAMPLE_CID));
        assert_eq!(record.content_address_uri, format!("ipfs://{}", SAMPLE_CID));
    }
}
