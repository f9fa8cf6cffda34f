//! Leaderboard integration tests

use std::sync::Arc;

use evermark_core::leaderboard::is_well_ranked;
use evermark_core::testing::{offline_gateway, InMemoryFastStore, InMemoryLedger};
use evermark_core::{CoreConfig, EvermarkCore, TieBreak, Votes};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("evermark_core=debug")
        .with_test_writer()
        .try_init();
}

fn core_with(ledger: InMemoryLedger, store: InMemoryFastStore, tie_break: TieBreak) -> EvermarkCore {
    let mut config = CoreConfig::default();
    config.leaderboard.tie_break = tie_break;

    EvermarkCore::builder()
        .config(config)
        .ledger(Arc::new(ledger))
        .fast_store(Arc::new(store))
        .gateway(Arc::new(offline_gateway()))
        .build()
        .expect("valid core")
}

fn summary(core_board: &[evermark_core::LeaderboardEntry]) -> Vec<(u64, Votes, u32)> {
    core_board
        .iter()
        .map(|e| (e.record.id.get(), e.votes, e.rank))
        .collect()
}

/// Votes {A:100, B:100, C:50}: ranks 1,2,3 with A/B in enumeration order
#[tokio::test]
async fn test_tied_votes_rank_in_enumeration_order() {
    init_tracing();

    let ledger = InMemoryLedger::with_records(3)
        .with_current_cycle(2)
        .with_live_votes(2, vec![(1, 100), (2, 100), (3, 50)]);
    let core = core_with(ledger, InMemoryFastStore::new(), TieBreak::EnumerationOrder);

    let board = core.current_leaderboard(10).await.unwrap();
    assert_eq!(summary(&board), vec![(1, 100, 1), (2, 100, 2), (3, 50, 3)]);

    let reversed = InMemoryLedger::with_records(3)
        .with_current_cycle(2)
        .with_live_votes(2, vec![(2, 100), (1, 100), (3, 50)]);
    let core = core_with(reversed, InMemoryFastStore::new(), TieBreak::EnumerationOrder);

    let board = core.current_leaderboard(10).await.unwrap();
    assert_eq!(summary(&board), vec![(2, 100, 1), (1, 100, 2), (3, 50, 3)]);
}

#[tokio::test]
async fn test_ascending_id_ties_are_deterministic_across_tiers() {
    init_tracing();

    let from_ledger = core_with(
        InMemoryLedger::with_records(3).with_finalized(1, vec![(3, 100), (1, 100), (2, 50)]),
        InMemoryFastStore::new(),
        TieBreak::AscendingId,
    );
    let from_store = core_with(
        InMemoryLedger::with_records(3),
        InMemoryFastStore::new().with_leaderboard(1, vec![(1, 100), (3, 100), (2, 50)]),
        TieBreak::AscendingId,
    );

    let a = summary(&from_ledger.leaderboard(1, 10).await.unwrap());
    let b = summary(&from_store.leaderboard(1, 10).await.unwrap());
    assert_eq!(a, vec![(1, 100, 1), (3, 100, 2), (2, 50, 3)]);
    assert_eq!(a, b);
}

#[tokio::test(start_paused = true)]
async fn test_large_live_tally_is_well_ranked() {
    init_tracing();

    let votes: Vec<(u64, Votes)> = (1..=30).map(|id| (id, Votes::from((id * 7) % 11))).collect();
    let ledger = InMemoryLedger::with_records(30).with_live_votes(5, votes);
    let core = core_with(ledger, InMemoryFastStore::new(), TieBreak::EnumerationOrder);

    let board = core.leaderboard(5, 12).await.unwrap();
    assert_eq!(board.len(), 12);
    assert!(is_well_ranked(&board));
    assert_eq!(board[0].votes, 10);
}
