//! Error types for evermark-core

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types
///
/// Only systemic failures travel up to the presentation layer. Gateway
/// failures degrade to empty metadata and per-item batch failures degrade to
/// `None`, so those variants mostly show up in logs and reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Malformed content address, rejected before any network access
    #[error("Invalid content address: {0}")]
    InvalidAddress(String),

    /// Record does not exist on the ledger
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Every gateway endpoint failed for a content address
    #[error("All gateways failed for {0}")]
    GatewayExhausted(String),

    /// Read failure on the authoritative ledger
    #[error("Ledger read error: {0}")]
    Ledger(String),

    /// Fast store query failed or timed out
    #[error("Fast store error: {0}")]
    FastStore(String),

    /// Network error outside the gateway failover loop
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Input rejected by validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A guarded operation is already running
    #[error("Operation already in flight: {0}")]
    Busy(String),

    /// Capability not wired in at construction
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Ledger(_) | CoreError::FastStore(_) | CoreError::Network(_)
        )
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::InvalidAddress("ipfs://abc".to_string());
        assert_eq!(err.to_string(), "Invalid content address: ipfs://abc");

        let err = CoreError::Ledger("rpc timeout".to_string());
        assert!(err.to_string().contains("rpc timeout"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(CoreError::Ledger("x".into()).is_transient());
        assert!(CoreError::FastStore("x".into()).is_transient());
        assert!(!CoreError::InvalidAddress("x".into()).is_transient());
        assert!(!CoreError::Busy("publish".into()).is_transient());
    }

    #[test]
    fn test_from_serde_json() {
        let err: CoreError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
