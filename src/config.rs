//! Configuration for evermark-core
//!
//! Every section has sensible defaults and can be overridden from
//! environment variables. Configuration is process-wide and read-only once
//! the core is built.

use std::time::Duration;

use crate::error::{CoreError, Result};

/// Default public gateways, tried in order
pub const DEFAULT_GATEWAYS: &[&str] = &[
    "https://ipfs.io",
    "https://cloudflare-ipfs.com",
    "https://gateway.pinata.cloud",
    "https://dweb.link",
];

/// Minimum number of equivalent gateway endpoints
pub const MIN_GATEWAYS: usize = 3;

/// Top-level configuration
#[derive(Debug, Clone, Default)]
pub struct CoreConfig {
    pub gateway: GatewayConfig,
    pub batch: BatchConfig,
    pub listing: ListingConfig,
    pub leaderboard: LeaderboardConfig,
}

impl CoreConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self {
            gateway: GatewayConfig::from_env(),
            batch: BatchConfig::from_env(),
            listing: ListingConfig::from_env(),
            leaderboard: LeaderboardConfig::from_env(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.gateway.validate()?;

        if self.batch.concurrency == 0 {
            return Err(CoreError::Config(
                "EVERMARK_BATCH_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.listing.fast_store_timeout.is_zero() || self.listing.ledger_timeout.is_zero() {
            return Err(CoreError::Config(
                "listing timeouts must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Gateway
// ============================================================================

/// Content-address gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Equivalent base URLs, tried in order
    pub endpoints: Vec<String>,
    /// Per-endpoint request timeout
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_GATEWAYS.iter().map(|s| s.to_string()).collect(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl GatewayConfig {
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            ..Default::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(list) = std::env::var("EVERMARK_GATEWAYS") {
            let endpoints = parse_endpoint_list(&list);
            if !endpoints.is_empty() {
                config.endpoints = endpoints;
            }
        }

        if let Some(secs) = env_parse::<u64>("EVERMARK_GATEWAY_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.len() < MIN_GATEWAYS {
            return Err(CoreError::Config(format!(
                "at least {} gateway endpoints are required, got {}",
                MIN_GATEWAYS,
                self.endpoints.len()
            )));
        }

        if let Some(bad) = self
            .endpoints
            .iter()
            .find(|e| !(e.starts_with("http://") || e.starts_with("https://")))
        {
            return Err(CoreError::Config(format!("gateway is not an http(s) URL: {}", bad)));
        }

        if self.request_timeout.is_zero() {
            return Err(CoreError::Config("gateway timeout must be non-zero".to_string()));
        }

        Ok(())
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Bounded-concurrency batch fetch configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Fetches in flight per chunk
    pub concurrency: usize,
    /// Pause between chunks to stay under the ledger's rate limit
    pub chunk_interval: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            chunk_interval: Duration::from_millis(200),
        }
    }
}

impl BatchConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            concurrency: env_parse("EVERMARK_BATCH_CONCURRENCY").unwrap_or(defaults.concurrency),
            chunk_interval: env_parse("EVERMARK_BATCH_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.chunk_interval),
        }
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Tiered listing configuration
#[derive(Debug, Clone)]
pub struct ListingConfig {
    /// Fall back to the ledger when the fast store is empty or failing
    pub fallback_enabled: bool,
    pub fast_store_timeout: Duration,
    /// Applied to each individual ledger read
    pub ledger_timeout: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            fallback_enabled: true,
            fast_store_timeout: Duration::from_secs(5),
            ledger_timeout: Duration::from_secs(15),
        }
    }
}

impl ListingConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            fallback_enabled: env_parse("EVERMARK_LEDGER_FALLBACK")
                .unwrap_or(defaults.fallback_enabled),
            fast_store_timeout: env_parse("EVERMARK_FAST_STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fast_store_timeout),
            ledger_timeout: env_parse("EVERMARK_LEDGER_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.ledger_timeout),
        }
    }
}

// ============================================================================
// Leaderboard
// ============================================================================

/// Ordering of records with equal votes.
///
/// The default keeps source order, so the same tally can order ties
/// differently depending on which tier served it. Use
/// [`TieBreak::AscendingId`] for an order that holds across tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Keep the order the serving tier enumerated them in
    #[default]
    EnumerationOrder,
    /// Lower record id first
    AscendingId,
}

impl TieBreak {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "enumeration" | "enumeration-order" => Some(Self::EnumerationOrder),
            "ascending-id" | "id" => Some(Self::AscendingId),
            _ => None,
        }
    }
}

/// Leaderboard aggregation configuration
#[derive(Debug, Clone)]
pub struct LeaderboardConfig {
    /// Live tallies at or below this count are read one at a time
    pub sequential_threshold: usize,
    pub tie_break: TieBreak,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            sequential_threshold: 5,
            tie_break: TieBreak::default(),
        }
    }
}

impl LeaderboardConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sequential_threshold: env_parse("EVERMARK_LEADERBOARD_SEQUENTIAL_THRESHOLD")
                .unwrap_or(defaults.sequential_threshold),
            tie_break: std::env::var("EVERMARK_TIE_BREAK")
                .ok()
                .and_then(|s| TieBreak::parse(&s))
                .unwrap_or(defaults.tie_break),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Split a comma-separated endpoint list, dropping blanks and trailing slashes
pub fn parse_endpoint_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
