//! Multi-gateway metadata resolver
//!
//! Resolves a content address to canonical metadata by walking an ordered
//! list of equivalent gateways. The first endpoint that answers 2xx with
//! parseable JSON wins; every other outcome moves on to the next endpoint.
//! Exhausting the list is not an error: callers get empty metadata.
//!
//! ```text
//! address ──parse──► ContentAddress ──► gateway[0] ──fail──► gateway[1] ──fail──► ... ──► default
//!    │                                      │ ok                 │ ok
//!    └─ InvalidAddress (no network)         └──── migrate ◄──────┘
//! ```

use reqwest::header;
use serde_json::Value;
use tracing::{debug, warn};

use super::address::ContentAddress;
use super::schema::{self, ContentMetadata};
use crate::config::GatewayConfig;
use crate::error::{CoreError, Result};

/// Resolves content addresses through redundant gateways
pub struct GatewayResolver {
    http_client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayResolver {
    /// Create a resolver over the configured endpoints
    pub fn new(config: GatewayConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent("evermark-core/0.1")
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            config,
        }
    }

    /// Create a resolver sharing an existing HTTP client
    pub fn with_client(config: GatewayConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.config.endpoints
    }

    /// Resolve a content-address URI to metadata.
    ///
    /// Fails only with [`CoreError::InvalidAddress`], before any network
    /// access. Gateway failures degrade to `ContentMetadata::default()`.
    pub async fn resolve(&self, address: &str) -> Result<ContentMetadata> {
        let address = ContentAddress::parse(address)?;
        Ok(self.resolve_address(&address).await)
    }

    /// Like [`resolve`](Self::resolve), with malformed addresses also
    /// degrading to empty metadata.
    pub async fn resolve_or_default(&self, address: &str) -> ContentMetadata {
        match self.resolve(address).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(address = %address, error = %e, "Skipping metadata resolution");
                ContentMetadata::default()
            }
        }
    }

    /// Resolve an already-validated address
    pub async fn resolve_address(&self, address: &ContentAddress) -> ContentMetadata {
        for endpoint in &self.config.endpoints {
            match self.fetch_json(endpoint, address).await {
                Ok(document) => {
                    debug!(endpoint = %endpoint, cid = %address.hash(), "Metadata resolved");
                    return schema::migrate(document);
                }
                Err(e) => {
                    warn!(
                        endpoint = %endpoint,
                        cid = %address.hash(),
                        error = %e,
                        "Gateway failed, trying next endpoint"
                    );
                }
            }
        }

        let exhausted = CoreError::GatewayExhausted(address.to_string());
        warn!(
            endpoints = self.config.endpoints.len(),
            error = %exhausted,
            "Using empty metadata"
        );
        ContentMetadata::default()
    }

    /// HTTP URL for an image reference.
    ///
    /// `ipfs://` references and `/ipfs/` gateway URLs are rewritten onto the
    /// first gateway. Other HTTP URLs pass through; anything else is empty.
    pub fn image_url(&self, image: &str) -> String {
        let image = image.trim();
        if image.is_empty() {
            return String::new();
        }

        if image.starts_with("http://") || image.starts_with("https://") {
            if let Ok(address) = ContentAddress::parse(image) {
                if let Some(base) = self.config.endpoints.first() {
                    return address.url_on(base);
                }
            }
            return image.to_string();
        }

        match (ContentAddress::parse(image), self.config.endpoints.first()) {
            (Ok(address), Some(base)) => address.url_on(base),
            _ => String::new(),
        }
    }

    async fn fetch_json(&self, endpoint: &str, address: &ContentAddress) -> Result<Value> {
        let url = address.url_on(endpoint);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.config.request_timeout)
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CoreError::Network(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| CoreError::Serialization(format!("invalid JSON from {}: {}", url, e)))
    }
}
