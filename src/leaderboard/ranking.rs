//! Vote ranking

use std::collections::HashSet;

use crate::config::TieBreak;
use crate::types::{ContentRecord, LeaderboardEntry, RecordId, Votes};

/// Drop repeated record ids, keeping the first occurrence of each
pub fn dedupe_by_id<T>(candidates: Vec<T>, key: impl Fn(&T) -> RecordId) -> Vec<T> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates.into_iter().filter(|c| seen.insert(key(c))).collect()
}

/// Sort candidates by votes, highest first.
///
/// The sort is stable, so with [`TieBreak::EnumerationOrder`] equal tallies
/// keep the order the source listed them in.
pub fn rank_by_votes<T>(
    candidates: &mut [T],
    tie_break: TieBreak,
    key: impl Fn(&T) -> (RecordId, Votes),
) {
    candidates.sort_by(|a, b| {
        let (a_id, a_votes) = key(a);
        let (b_id, b_votes) = key(b);
        let by_votes = b_votes.cmp(&a_votes);
        match tie_break {
            TieBreak::EnumerationOrder => by_votes,
            TieBreak::AscendingId => by_votes.then_with(|| a_id.cmp(&b_id)),
        }
    });
}

/// Number hydrated rows `1..=n` in the order given
pub fn assign_ranks(rows: impl IntoIterator<Item = (ContentRecord, Votes)>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(index, (record, votes))| LeaderboardEntry {
            record,
            votes,
            rank: u32::try_from(index + 1).unwrap_or(u32::MAX),
        })
        .collect()
}

/// Whether `entries` is ranked: votes never increase and ranks are `i + 1`
pub fn is_well_ranked(entries: &[LeaderboardEntry]) -> bool {
    let contiguous = entries
        .iter()
        .enumerate()
        .all(|(i, e)| e.rank as usize == i + 1);
    let monotonic = entries
        .windows(2)
        .all(|w| w[0].votes >= w[1].votes);
    contiguous && monotonic
}
