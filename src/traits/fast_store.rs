//! Fast-store read contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{CachedTally, CacheRecord, CycleId, PageParams, SortBy, SortOrder};

/// Query sent to the fast store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FastStoreQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub filters: HashMap<String, String>,
}

impl From<&PageParams> for FastStoreQuery {
    fn from(params: &PageParams) -> Self {
        Self {
            page: params.page,
            page_size: params.page_size,
            sort_by: params.sort_by,
            sort_order: params.sort_order,
            search: params.search.clone(),
            author: params.author.clone(),
            filters: params.filters.clone(),
        }
    }
}

/// Fast-store answer. "No data" is a normal answer, distinct from an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastStoreResponse {
    NoData,
    Rows {
        rows: Vec<CacheRecord>,
        total_count: u64,
    },
}

impl FastStoreResponse {
    pub fn is_empty(&self) -> bool {
        match self {
            FastStoreResponse::NoData => true,
            FastStoreResponse::Rows { rows, .. } => rows.is_empty(),
        }
    }
}

/// Read access to the eventually-consistent fast store
#[async_trait]
pub trait FastStore: Send + Sync {
    /// Page through cached records
    async fn query(&self, query: &FastStoreQuery) -> Result<FastStoreResponse>;

    /// Precomputed leaderboard for a cycle; `None` when not available
    async fn leaderboard(&self, cycle: CycleId, limit: usize) -> Result<Option<Vec<CachedTally>>>;
}

/// Fast store for deployments without one; every read is "no data".
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFastStore;

#[async_trait]
impl FastStore for NullFastStore {
    async fn query(&self, _query: &FastStoreQuery) -> Result<FastStoreResponse> {
        Ok(FastStoreResponse::NoData)
    }

    async fn leaderboard(&self, _cycle: CycleId, _limit: usize) -> Result<Option<Vec<CachedTally>>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_from_params() {
        let params = PageParams::new(3, 25).with_search("bridges");
        let query = FastStoreQuery::from(&params);
        assert_eq!(query.page, 3);
        assert_eq!(query.page_size, 25);
        assert_eq!(query.search.as_deref(), Some("bridges"));

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["pageSize"], 25);
        assert!(json.get("author").is_none());
        assert!(json.get("filters").is_none());
    }

    #[test]
    fn test_response_emptiness() {
        assert!(FastStoreResponse::NoData.is_empty());
        assert!(FastStoreResponse::Rows { rows: vec![], total_count: 0 }.is_empty());
    }

    #[tokio::test]
    async fn test_null_store_has_no_data() {
        let store = NullFastStore;
        let query = FastStoreQuery::from(&PageParams::default());
        assert_eq!(store.query(&query).await.unwrap(), FastStoreResponse::NoData);
        assert!(store.leaderboard(1, 10).await.unwrap().is_none());
    }
}
