//! Authoritative ledger read contract

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CycleId, LedgerRecord, RecordId, VoteTally, Votes};

/// Read access to the ledger.
///
/// Every call is an individually rate-limited request that may fail
/// transiently. Implementations report failures as
/// [`CoreError::Ledger`](crate::CoreError::Ledger).
#[async_trait]
pub trait LedgerReader: Send + Sync {
    /// Whether a token with this id has been minted
    async fn exists(&self, id: RecordId) -> Result<bool>;

    /// Core tuple for a minted token
    async fn record(&self, id: RecordId) -> Result<LedgerRecord>;

    /// Number of tokens minted so far (highest id)
    async fn total_supply(&self) -> Result<u64>;

    /// Id of the cycle currently accepting votes
    async fn current_cycle(&self) -> Result<CycleId>;

    /// Whether the cycle's tallies are frozen
    async fn is_cycle_finalized(&self, cycle: CycleId) -> Result<bool>;

    /// Ranked tallies stored at finalization, best first
    async fn finalized_leaderboard(&self, cycle: CycleId) -> Result<Vec<VoteTally>>;

    /// Records that received votes during the cycle, in ledger order
    async fn active_record_ids(&self, cycle: CycleId) -> Result<Vec<RecordId>>;

    /// Live vote total for one record in one cycle
    async fn record_votes(&self, cycle: CycleId, id: RecordId) -> Result<Votes>;
}
