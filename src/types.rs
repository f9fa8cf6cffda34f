//! Core data model
//!
//! Records are immutable once minted. The fast store keeps denormalized,
//! possibly-stale copies ([`CacheRecord`]); the ledger is the source of truth
//! ([`ContentRecord`] is always assembled from it or converted from a cache
//! row that passed the same validation).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Identifiers
// ============================================================================

/// Ledger-assigned token id. Minted sequentially starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id)
    }
}

/// Voting cycle identifier
pub type CycleId = u64;

/// Stake-weighted vote amount (wei-scale, hence 128 bits)
pub type Votes = u128;

// ============================================================================
// Records
// ============================================================================

/// A fully hydrated content record.
///
/// `title` and `content_address_uri` are never empty; fetchers return `None`
/// instead of building a record without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: RecordId,
    pub title: String,
    /// Display name supplied at mint time
    pub author_display_name: String,
    /// Minting address; the ownership proof, distinct from the display author
    pub creator_address: String,
    pub description: String,
    pub source_url: String,
    pub image_url: String,
    #[serde(rename = "contentAddressURI")]
    pub content_address_uri: String,
    /// Seconds since epoch, ledger time
    pub created_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
}

impl ContentRecord {
    /// Creation time as a UTC timestamp
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(i64::try_from(self.created_at).ok()?, 0)
    }
}

/// Denormalized projection of a record, owned by the fast store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    pub token_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub processed_image_url: Option<String>,
    #[serde(default, rename = "metadataURI")]
    pub metadata_uri: String,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub referrer: Option<String>,
}

impl CacheRecord {
    /// Convert into a [`ContentRecord`], preferring the processed image.
    ///
    /// Returns `None` when the row lacks a title or content address.
    pub fn into_content_record(self) -> Option<ContentRecord> {
        if self.title.trim().is_empty() || self.metadata_uri.trim().is_empty() {
            return None;
        }

        let image_url = match self.processed_image_url {
            Some(url) if !url.is_empty() => url,
            _ => self.image_url,
        };

        Some(ContentRecord {
            id: self.token_id,
            title: self.title,
            author_display_name: self.author,
            creator_address: self.owner,
            description: self.description,
            source_url: self.source_url,
            image_url,
            content_address_uri: self.metadata_uri,
            created_at: self.created_at,
            referrer: self.referrer,
        })
    }
}

/// Core tuple as stored on the ledger for one token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub title: String,
    /// Display author recorded at mint time
    pub creator: String,
    pub content_uri: String,
    pub created_at: u64,
    pub minter: String,
    pub referrer: Option<String>,
}

// ============================================================================
// Votes and leaderboard
// ============================================================================

/// Votes for one record within one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub record_id: RecordId,
    pub cycle_id: CycleId,
    pub votes: Votes,
}

/// Precomputed leaderboard row served by the fast store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTally {
    pub record: CacheRecord,
    pub votes: Votes,
}

/// One ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub record: ContentRecord,
    pub votes: Votes,
    /// 1-based, contiguous
    pub rank: u32,
}

// ============================================================================
// Listing
// ============================================================================

/// Sort key for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    CreatedAt,
    Title,
    Author,
    Votes,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Page, sort and filter parameters for a listing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub search: Option<String>,
    pub author: Option<String>,
    /// Store-specific filters passed through to the fast store untouched
    pub filters: HashMap<String, String>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 12,
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            search: None,
            author: None,
            filters: HashMap::new(),
        }
    }
}

impl PageParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            ..Default::default()
        }
    }

    pub fn with_sort(mut self, sort_by: SortBy, sort_order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}

/// Which tier produced a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    FastStore,
    Ledger,
    /// Neither tier produced rows
    Empty,
}

/// One page of records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub records: Vec<ContentRecord>,
    pub total_count: u64,
    pub source: SourceTier,
}

impl Listing {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            total_count: 0,
            source: SourceTier::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
