//! Leaderboard aggregation and ranking

pub mod aggregator;
pub mod ranking;

pub use aggregator::LeaderboardAggregator;
pub use ranking::{assign_ranks, dedupe_by_id, is_well_ranked, rank_by_votes};
