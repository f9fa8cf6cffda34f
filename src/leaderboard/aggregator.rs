//! Per-cycle leaderboard aggregation
//!
//! Tallies come from the first source able to provide them:
//!
//! ```text
//! fast store leaderboard ──none/error──► finalized ledger board ──not final──► live tally
//!   (rows carry records)                   (ids + votes)                        (ids, then votes per id)
//! ```
//!
//! Every tier is deduplicated by record id, keeping the first occurrence.
//! A cached board with no usable rows counts as unavailable.
//! Ledger-sourced tallies are ranked, cut to `limit`, then hydrated through
//! the batch fetcher. Rows that fail to hydrate are dropped and the
//! remaining ranks renumbered.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::ranking::{assign_ranks, dedupe_by_id, rank_by_votes};
use crate::config::LeaderboardConfig;
use crate::error::{CoreError, Result};
use crate::fetch::{run_chunked, with_deadline, BatchFetcher};
use crate::traits::{FastStore, LedgerReader};
use crate::types::{CachedTally, CycleId, LeaderboardEntry, RecordId, Votes};

/// Builds ranked leaderboards for voting cycles
pub struct LeaderboardAggregator {
    fast_store: Arc<dyn FastStore>,
    ledger: Arc<dyn LedgerReader>,
    batch: BatchFetcher,
    config: LeaderboardConfig,
    fast_store_timeout: Duration,
    ledger_timeout: Duration,
}

impl LeaderboardAggregator {
    pub fn new(
        fast_store: Arc<dyn FastStore>,
        ledger: Arc<dyn LedgerReader>,
        batch: BatchFetcher,
        config: LeaderboardConfig,
        fast_store_timeout: Duration,
        ledger_timeout: Duration,
    ) -> Self {
        Self {
            fast_store,
            ledger,
            batch,
            config,
            fast_store_timeout,
            ledger_timeout,
        }
    }

    /// Leaderboard for the cycle currently accepting votes
    pub async fn current_leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let cycle = with_deadline(
            self.ledger_timeout,
            "currentCycle",
            CoreError::Ledger,
            self.ledger.current_cycle(),
        )
        .await?;

        self.leaderboard(cycle, limit).await
    }

    /// Top `limit` records of a cycle, ranked from 1.
    pub async fn leaderboard(&self, cycle: CycleId, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(rows) = self.cached_board(cycle, limit).await {
            let board = self.rank_cached(rows, limit);
            if !board.is_empty() {
                debug!(cycle = cycle, rows = board.len(), "Leaderboard served by fast store");
                return Ok(board);
            }
            warn!(cycle = cycle, "Cached leaderboard has no usable rows, using ledger");
        }

        let tallies = self.ledger_tallies(cycle).await?;
        let mut tallies = dedupe_by_id(tallies, |&(id, _)| id);
        rank_by_votes(&mut tallies, self.config.tie_break, |&(id, votes)| (id, votes));
        tallies.truncate(limit);

        let ids: Vec<RecordId> = tallies.iter().map(|(id, _)| *id).collect();
        let records = self.batch.fetch_batch(&ids).await;

        let hydrated: Vec<_> = records
            .into_iter()
            .zip(tallies)
            .filter_map(|(record, (id, votes))| match record {
                Some(record) => Some((record, votes)),
                None => {
                    warn!(cycle = cycle, id = %id, "Dropping leaderboard row that failed to hydrate");
                    None
                }
            })
            .collect();

        info!(cycle = cycle, entries = hydrated.len(), "Leaderboard built from ledger");
        Ok(assign_ranks(hydrated))
    }

    async fn cached_board(&self, cycle: CycleId, limit: usize) -> Option<Vec<CachedTally>> {
        let cached = with_deadline(
            self.fast_store_timeout,
            "fast store leaderboard",
            CoreError::FastStore,
            self.fast_store.leaderboard(cycle, limit),
        )
        .await;

        match cached {
            Ok(Some(rows)) if !rows.is_empty() => Some(rows),
            Ok(_) => {
                debug!(cycle = cycle, "No cached leaderboard");
                None
            }
            Err(e) => {
                warn!(cycle = cycle, error = %e, "Fast store leaderboard failed, using ledger");
                None
            }
        }
    }

    fn rank_cached(&self, rows: Vec<CachedTally>, limit: usize) -> Vec<LeaderboardEntry> {
        let mut rows = dedupe_by_id(rows, |row| row.record.token_id);
        rank_by_votes(&mut rows, self.config.tie_break, |row| {
            (row.record.token_id, row.votes)
        });

        let converted = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.record.token_id;
                let votes = row.votes;
                let record = row.record.into_content_record();
                if record.is_none() {
                    debug!(id = %id, "Skipping incomplete cached leaderboard row");
                }
                record.map(|r| (r, votes))
            })
            .take(limit);

        assign_ranks(converted)
    }

    async fn ledger_tallies(&self, cycle: CycleId) -> Result<Vec<(RecordId, Votes)>> {
        let finalized = with_deadline(
            self.ledger_timeout,
            "isCycleFinalized",
            CoreError::Ledger,
            self.ledger.is_cycle_finalized(cycle),
        )
        .await?;

        if finalized {
            let board = with_deadline(
                self.ledger_timeout,
                "finalizedLeaderboard",
                CoreError::Ledger,
                self.ledger.finalized_leaderboard(cycle),
            )
            .await?;
            debug!(cycle = cycle, rows = board.len(), "Using finalized leaderboard");
            return Ok(board.into_iter().map(|t| (t.record_id, t.votes)).collect());
        }

        self.live_tally(cycle).await
    }

    async fn live_tally(&self, cycle: CycleId) -> Result<Vec<(RecordId, Votes)>> {
        let ids = with_deadline(
            self.ledger_timeout,
            "activeRecordIds",
            CoreError::Ledger,
            self.ledger.active_record_ids(cycle),
        )
        .await?;
        let ids = dedupe_by_id(ids, |&id| id);

        let read = |id: RecordId| async move {
            let votes = with_deadline(
                self.ledger_timeout,
                "recordVotes",
                CoreError::Ledger,
                self.ledger.record_votes(cycle, id),
            )
            .await;
            (id, votes)
        };

        let settled = if ids.len() <= self.config.sequential_threshold {
            let mut settled = Vec::with_capacity(ids.len());
            for id in ids {
                settled.push(read(id).await);
            }
            settled
        } else {
            let batch = self.batch.config();
            run_chunked(ids, batch.concurrency, batch.chunk_interval, read).await
        };

        debug!(cycle = cycle, candidates = settled.len(), "Live tally read");

        Ok(settled
            .into_iter()
            .filter_map(|(id, votes)| match votes {
                Ok(votes) => Some((id, votes)),
                Err(e) => {
                    warn!(cycle = cycle, id = %id, error = %e, "Dropping record with unreadable tally");
                    None
                }
            })
            .collect())
    }
}
