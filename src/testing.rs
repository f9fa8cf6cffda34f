//! In-memory collaborators for tests and local development
//!
//! Each implementation keeps call counters so tests can assert which tier
//! served a request, and supports failure injection and artificial latency.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cid::multihash::Multihash;
use cid::Cid;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::config::GatewayConfig;
use crate::error::{CoreError, Result};
use crate::gateway::GatewayResolver;
use crate::traits::{FastStore, FastStoreQuery, FastStoreResponse, LedgerReader, UploadFile, UploadSink};
use crate::types::{CacheRecord, CachedTally, CycleId, LedgerRecord, RecordId, VoteTally, Votes};

/// A valid CIDv0 used by fixture records
pub const SAMPLE_CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

/// Resolver with no endpoints: every resolution yields empty metadata
/// without touching the network.
pub fn offline_gateway() -> GatewayResolver {
    GatewayResolver::new(GatewayConfig::new(Vec::new()))
}

/// Ledger tuple for fixture id `n`
pub fn ledger_record(n: u64) -> LedgerRecord {
    LedgerRecord {
        title: format!("Evermark #{}", n),
        creator: format!("Author {}", n),
        content_uri: format!("ipfs://{}", SAMPLE_CID),
        created_at: 1_700_000_000 + n * 60,
        minter: format!("0x{:040x}", n),
        referrer: None,
    }
}

/// Fast-store row for fixture id `n`
pub fn cache_record(n: u64) -> CacheRecord {
    CacheRecord {
        token_id: RecordId(n),
        title: format!("Evermark #{}", n),
        author: format!("Author {}", n),
        owner: format!("0x{:040x}", n),
        description: format!("Cached description {}", n),
        source_url: format!("https://example.com/{}", n),
        image_url: String::new(),
        processed_image_url: None,
        metadata_uri: format!("ipfs://{}", SAMPLE_CID),
        created_at: 1_700_000_000 + n * 60,
        verified: true,
        referrer: None,
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Decrements the in-flight gauge on drop
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(gauge: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = gauge.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(gauge)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory ledger.
///
/// `total_supply` is the highest minted id unless overridden. Live tallies
/// are kept in insertion order, which is the enumeration order reported by
/// `active_record_ids`.
#[derive(Default)]
pub struct InMemoryLedger {
    records: RwLock<BTreeMap<RecordId, LedgerRecord>>,
    supply_override: Option<u64>,
    current_cycle: AtomicU64,
    finalized: RwLock<HashMap<CycleId, Vec<VoteTally>>>,
    live: RwLock<HashMap<CycleId, Vec<(RecordId, Votes)>>>,

    failing_records: HashSet<RecordId>,
    failing_votes: HashSet<RecordId>,
    fail_supply: AtomicBool,
    fail_cycles: AtomicBool,
    delay: Duration,
    record_delays: HashMap<RecordId, Duration>,

    record_calls: AtomicUsize,
    supply_calls: AtomicUsize,
    vote_calls: AtomicUsize,
    finalized_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    record_log: Mutex<Vec<(RecordId, Instant)>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger with fixture records `1..=count`
    pub fn with_records(count: u64) -> Self {
        (1..=count).fold(Self::new(), |ledger, n| {
            ledger.with_record(RecordId(n), ledger_record(n))
        })
    }

    pub fn with_record(mut self, id: RecordId, record: LedgerRecord) -> Self {
        self.records.get_mut().insert(id, record);
        self
    }

    pub fn with_total_supply(mut self, supply: u64) -> Self {
        self.supply_override = Some(supply);
        self
    }

    pub fn with_current_cycle(self, cycle: CycleId) -> Self {
        self.current_cycle.store(cycle, Ordering::SeqCst);
        self
    }

    /// Frozen leaderboard for a cycle (marks the cycle finalized)
    pub fn with_finalized(mut self, cycle: CycleId, tallies: Vec<(u64, Votes)>) -> Self {
        let tallies = tallies
            .into_iter()
            .map(|(id, votes)| VoteTally {
                record_id: RecordId(id),
                cycle_id: cycle,
                votes,
            })
            .collect();
        self.finalized.get_mut().insert(cycle, tallies);
        self
    }

    /// Live tallies for an open cycle, in enumeration order
    pub fn with_live_votes(mut self, cycle: CycleId, tallies: Vec<(u64, Votes)>) -> Self {
        let tallies = tallies
            .into_iter()
            .map(|(id, votes)| (RecordId(id), votes))
            .collect();
        self.live.get_mut().insert(cycle, tallies);
        self
    }

    pub fn failing_record(mut self, id: RecordId) -> Self {
        self.failing_records.insert(id);
        self
    }

    pub fn failing_votes(mut self, id: RecordId) -> Self {
        self.failing_votes.insert(id);
        self
    }

    pub fn failing_supply(self) -> Self {
        self.fail_supply.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_cycles(self) -> Self {
        self.fail_cycles.store(true, Ordering::SeqCst);
        self
    }

    /// Latency added to every read
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Extra latency for `record` reads of one id
    pub fn with_record_delay(mut self, id: RecordId, delay: Duration) -> Self {
        self.record_delays.insert(id, delay);
        self
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }

    pub fn supply_calls(&self) -> usize {
        self.supply_calls.load(Ordering::SeqCst)
    }

    pub fn vote_calls(&self) -> usize {
        self.vote_calls.load(Ordering::SeqCst)
    }

    pub fn finalized_calls(&self) -> usize {
        self.finalized_calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `exists`/`record` reads observed
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Ids passed to `record`, with the (possibly paused) clock at call time
    pub fn record_log(&self) -> Vec<(RecordId, Instant)> {
        self.record_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    async fn latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl LedgerReader for InMemoryLedger {
    async fn exists(&self, id: RecordId) -> Result<bool> {
        let _gauge = InFlight::enter(&self.in_flight, &self.max_in_flight);
        self.latency().await;
        Ok(self.records.read().await.contains_key(&id))
    }

    async fn record(&self, id: RecordId) -> Result<LedgerRecord> {
        let _gauge = InFlight::enter(&self.in_flight, &self.max_in_flight);
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.record_log.lock() {
            log.push((id, Instant::now()));
        }

        self.latency().await;
        if let Some(extra) = self.record_delays.get(&id) {
            tokio::time::sleep(*extra).await;
        }

        if self.failing_records.contains(&id) {
            return Err(CoreError::Ledger(format!("execution reverted for token {}", id)));
        }

        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::Ledger(format!("nonexistent token {}", id)))
    }

    async fn total_supply(&self) -> Result<u64> {
        self.supply_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;

        if self.fail_supply.load(Ordering::SeqCst) {
            return Err(CoreError::Ledger("totalSupply rate limited".to_string()));
        }

        match self.supply_override {
            Some(supply) => Ok(supply),
            None => Ok(self
                .records
                .read()
                .await
                .keys()
                .next_back()
                .map(|id| id.get())
                .unwrap_or(0)),
        }
    }

    async fn current_cycle(&self) -> Result<CycleId> {
        self.latency().await;
        if self.fail_cycles.load(Ordering::SeqCst) {
            return Err(CoreError::Ledger("cycle read failed".to_string()));
        }
        Ok(self.current_cycle.load(Ordering::SeqCst))
    }

    async fn is_cycle_finalized(&self, cycle: CycleId) -> Result<bool> {
        self.latency().await;
        if self.fail_cycles.load(Ordering::SeqCst) {
            return Err(CoreError::Ledger("cycle read failed".to_string()));
        }
        Ok(self.finalized.read().await.contains_key(&cycle))
    }

    async fn finalized_leaderboard(&self, cycle: CycleId) -> Result<Vec<VoteTally>> {
        self.finalized_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;
        Ok(self
            .finalized
            .read()
            .await
            .get(&cycle)
            .cloned()
            .unwrap_or_default())
    }

    async fn active_record_ids(&self, cycle: CycleId) -> Result<Vec<RecordId>> {
        self.latency().await;
        Ok(self
            .live
            .read()
            .await
            .get(&cycle)
            .map(|tallies| tallies.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default())
    }

    async fn record_votes(&self, cycle: CycleId, id: RecordId) -> Result<Votes> {
        self.vote_calls.fetch_add(1, Ordering::SeqCst);
        self.latency().await;

        if self.failing_votes.contains(&id) {
            return Err(CoreError::Ledger(format!("getVotes failed for {}", id)));
        }

        Ok(self
            .live
            .read()
            .await
            .get(&cycle)
            .and_then(|tallies| tallies.iter().find(|(rid, _)| *rid == id))
            .map(|(_, votes)| *votes)
            .unwrap_or(0))
    }
}

// ============================================================================
// Fast store
// ============================================================================

/// In-memory fast store serving rows in stored order
#[derive(Default)]
pub struct InMemoryFastStore {
    rows: RwLock<Vec<CacheRecord>>,
    leaderboards: RwLock<HashMap<CycleId, Vec<CachedTally>>>,
    failing: AtomicBool,
    delay: Duration,
    query_calls: AtomicUsize,
    leaderboard_calls: AtomicUsize,
}

impl InMemoryFastStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, rows: Vec<CacheRecord>) -> Self {
        *self.rows.get_mut() = rows;
        self
    }

    pub fn with_leaderboard(mut self, cycle: CycleId, tallies: Vec<(u64, Votes)>) -> Self {
        let tallies = tallies
            .into_iter()
            .map(|(id, votes)| CachedTally {
                record: cache_record(id),
                votes,
            })
            .collect();
        self.leaderboards.get_mut().insert(cycle, tallies);
        self
    }

    /// Serve prebuilt cached rows for `cycle`
    pub fn with_cached_board(mut self, cycle: CycleId, tallies: Vec<CachedTally>) -> Self {
        self.leaderboards.get_mut().insert(cycle, tallies);
        self
    }

    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub fn leaderboard_calls(&self) -> usize {
        self.leaderboard_calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::FastStore("indexer unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FastStore for InMemoryFastStore {
    async fn query(&self, query: &FastStoreQuery) -> Result<FastStoreResponse> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;

        let rows = self.rows.read().await;
        if rows.is_empty() {
            return Ok(FastStoreResponse::NoData);
        }

        let size = query.page_size as usize;
        let start = (query.page.max(1) as usize - 1).saturating_mul(size);
        let page = rows.iter().skip(start).take(size).cloned().collect();

        Ok(FastStoreResponse::Rows {
            rows: page,
            total_count: rows.len() as u64,
        })
    }

    async fn leaderboard(&self, cycle: CycleId, limit: usize) -> Result<Option<Vec<CachedTally>>> {
        self.leaderboard_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;

        Ok(self
            .leaderboards
            .read()
            .await
            .get(&cycle)
            .map(|tallies| tallies.iter().take(limit).cloned().collect()))
    }
}

// ============================================================================
// Upload sink
// ============================================================================

const RAW_CODEC: u64 = 0x55;
const JSON_CODEC: u64 = 0x0200;
const IDENTITY_HASH: u64 = 0x00;

/// Upload sink that keeps everything in memory and answers with
/// deterministic CIDv1 `ipfs://` URIs.
#[derive(Default)]
pub struct InMemoryUploadSink {
    files: RwLock<HashMap<String, UploadFile>>,
    documents: RwLock<HashMap<String, serde_json::Value>>,
    failing_json: AtomicBool,
    delay: Duration,
    upload_calls: AtomicUsize,
}

impl InMemoryUploadSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing_json(&self, failing: bool) {
        self.failing_json.store(failing, Ordering::SeqCst);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub async fn document(&self, uri: &str) -> Option<serde_json::Value> {
        self.documents.read().await.get(uri).cloned()
    }

    pub async fn file(&self, uri: &str) -> Option<UploadFile> {
        self.files.read().await.get(uri).cloned()
    }

    async fn enter(&self) {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// `ipfs://` URI over an identity multihash of a 32-byte content fingerprint
fn content_uri(codec: u64, bytes: &[u8]) -> Result<String> {
    let mut digest = [0u8; 32];
    for (seed, chunk) in digest.chunks_mut(8).enumerate() {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        bytes.hash(&mut hasher);
        chunk.copy_from_slice(&hasher.finish().to_be_bytes());
    }

    let hash = Multihash::<64>::wrap(IDENTITY_HASH, &digest)
        .map_err(|e| CoreError::Serialization(e.to_string()))?;
    Ok(format!("ipfs://{}", Cid::new_v1(codec, hash)))
}

#[async_trait]
impl UploadSink for InMemoryUploadSink {
    async fn upload_file(&self, file: UploadFile) -> Result<String> {
        self.enter().await;
        let uri = content_uri(RAW_CODEC, &file.bytes)?;
        self.files.write().await.insert(uri.clone(), file);
        Ok(uri)
    }

    async fn upload_json(&self, document: &serde_json::Value) -> Result<String> {
        self.enter().await;
        if self.failing_json.load(Ordering::SeqCst) {
            return Err(CoreError::Network("pinning service returned 502".to_string()));
        }

        let bytes = serde_json::to_vec(document)?;
        let uri = content_uri(JSON_CODEC, &bytes)?;
        self.documents.write().await.insert(uri.clone(), document.clone());
        Ok(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ContentAddress;

    #[tokio::test]
    async fn test_ledger_supply_tracks_highest_id() {
        let ledger = InMemoryLedger::with_records(4);
        assert_eq!(ledger.total_supply().await.unwrap(), 4);

        let ledger = InMemoryLedger::with_records(4).with_total_supply(9);
        assert_eq!(ledger.total_supply().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_fast_store_pages() {
        let store = InMemoryFastStore::new().with_rows((1..=5).map(cache_record).collect());
        let query = FastStoreQuery::from(&crate::types::PageParams::new(2, 2));

        match store.query(&query).await.unwrap() {
            FastStoreResponse::Rows { rows, total_count } => {
                assert_eq!(total_count, 5);
                let ids: Vec<u64> = rows.iter().map(|r| r.token_id.get()).collect();
                assert_eq!(ids, vec![3, 4]);
            }
            FastStoreResponse::NoData => panic!("expected rows"),
        }
    }

    #[tokio::test]
    async fn test_upload_uris_are_valid_addresses() {
        let sink = InMemoryUploadSink::new();
        let uri = sink
            .upload_json(&serde_json::json!({"description": "x"}))
            .await
            .unwrap();
        assert!(ContentAddress::parse(&uri).is_ok());

        let again = sink
            .upload_json(&serde_json::json!({"description": "x"}))
            .await
            .unwrap();
        assert_eq!(uri, again);
    }
}
