//! Evermark Core - content resolution and leaderboard aggregation
//!
//! Reconciles a fast, eventually-consistent read store with the
//! authoritative but slow and rate-limited ledger.
//!
//! # Architecture
//!
//! ```text
//! Gateway Resolver ──► Record Fetcher ──► Batch Fetcher ──┬──► Listing Resolver
//!  (CID → metadata)     (ledger + meta)    (bounded,      └──► Leaderboard Aggregator
//!                                            chunked)
//! ```
//!
//! - **Gateway**: resolves content-address URIs through redundant gateways
//!   with per-endpoint timeout and failover, migrating every known metadata
//!   shape to one canonical form.
//! - **Fetch**: hydrates records from the ledger, many at a time under a
//!   fixed concurrency bound with a pause between chunks.
//! - **Listing**: fast store first, ledger fallback when it is empty,
//!   failing or slow.
//! - **Leaderboard**: per-cycle tallies from the fast store, the finalized
//!   ledger board, or a live tally, ranked and hydrated.
//! - **Publish**: validates and uploads new metadata, one at a time.
//!
//! The ledger, fast store and upload sink are injected as trait objects.
//! Logging goes through `tracing`; the library never installs a subscriber.
//!
//! # Example
//!
//! ```rust,ignore
//! use evermark_core::{CoreConfig, EvermarkCore, PageParams};
//!
//! let core = EvermarkCore::builder()
//!     .config(CoreConfig::from_env())
//!     .ledger(ledger)
//!     .fast_store(indexer)
//!     .build()?;
//!
//! let page = core.list(&PageParams::new(1, 12)).await?;
//! let board = core.current_leaderboard(10).await?;
//! ```

// Configuration
pub mod config;

// Error types
pub mod error;

// Data model
pub mod types;

// Collaborator contracts
pub mod traits;

// Content-addressed metadata
pub mod gateway;

// Ledger-backed retrieval
pub mod fetch;

// Tiered listing
pub mod listing;

// Leaderboard aggregation
pub mod leaderboard;

// Single-flight guard and metadata publishing
pub mod guard;
pub mod publish;

// Wired-up entry point
pub mod service;

// In-memory collaborators
pub mod testing;

// Re-export configuration
pub use config::{BatchConfig, CoreConfig, GatewayConfig, LeaderboardConfig, ListingConfig, TieBreak};

// Re-export error types
pub use error::{CoreError, Result};

// Re-export data model
pub use types::{
    CacheRecord, CachedTally, ContentRecord, CycleId, LeaderboardEntry, LedgerRecord, Listing,
    PageParams, RecordId, SortBy, SortOrder, SourceTier, VoteTally, Votes,
};

// Re-export traits
pub use traits::{
    DisabledUploadSink, FastStore, FastStoreQuery, FastStoreResponse, LedgerReader, NullFastStore,
    UploadFile, UploadSink,
};

// Re-export components
pub use fetch::{BatchFailure, BatchFetcher, BatchOutcome, RecordFetcher};
pub use gateway::{ContentAddress, ContentMetadata, GatewayResolver, SchemaVersion};
pub use guard::{FlightPermit, FlightState, SingleFlight};
pub use leaderboard::LeaderboardAggregator;
pub use listing::{ListingResolver, ListingStats};
pub use publish::{MetadataDraft, MetadataPublisher, PublishedMetadata};
pub use service::{EvermarkCore, EvermarkCoreBuilder};
