//! Integration tests for community vote submission
//!
//! Tests cover:
//! - The full cast / cancel / switch sequence on one target
//! - Counters always equal the sum of live vote records
//! - Rejected votes write nothing
//! - Concurrent votes by one voter and by many voters

mod common;

use common::{seed_target, setup};
use tally_common::Error;
use tally_server::db::votes::sum_live_votes;
use tally_server::models::{TargetType, VoteKey};
use tally_server::voting::VoteChoice;
use tokio::task::JoinSet;

#[tokio::test]
async fn test_vote_sequence_on_one_target() {
    let env = setup().await;
    seed_target(&env.pool, TargetType::Post, "p1").await;
    let ledger = &env.state.ledger;

    let agg = ledger.get_aggregate(TargetType::Post, "p1").await.unwrap();
    assert_eq!((agg.upvotes, agg.downvotes), (0, 0));

    let steps = [
        (1, (1, 0), Some(VoteChoice::Up)),
        (1, (0, 0), None),
        (-1, (0, 1), Some(VoteChoice::Down)),
        (1, (1, 0), Some(VoteChoice::Up)),
    ];
    for (vote, expected, my_vote) in steps {
        let receipt = ledger.submit(TargetType::Post, "p1", "voter-a", vote).await.unwrap();
        assert_eq!((receipt.aggregate.upvotes, receipt.aggregate.downvotes), expected, "after vote {}", vote);
        assert_eq!(receipt.my_vote, my_vote);
    }

    let key = VoteKey::new("voter-a", TargetType::Post, "p1");
    assert_eq!(ledger.current_vote(&key).await.unwrap(), Some(VoteChoice::Up));
}

#[tokio::test]
async fn test_counters_match_live_records_over_mixed_sequences() {
    let env = setup().await;
    seed_target(&env.pool, TargetType::Comment, "c1").await;
    let ledger = &env.state.ledger;

    // Deterministic pseudo-random walk over voters and vote values
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    for _ in 0..200 {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let voter = format!("voter-{}", seed % 7);
        let vote = if (seed >> 8) % 2 == 0 { 1 } else { -1 };

        let receipt = ledger.submit(TargetType::Comment, "c1", &voter, vote).await.unwrap();
        let live = sum_live_votes(&env.pool, TargetType::Comment, "c1").await.unwrap();
        assert_eq!(receipt.aggregate.score(), live);
        assert!(receipt.aggregate.upvotes >= 0 && receipt.aggregate.downvotes >= 0);
    }
}

#[tokio::test]
async fn test_invalid_vote_value_writes_nothing() {
    let env = setup().await;
    seed_target(&env.pool, TargetType::Post, "p1").await;

    for bad in [0, 2, -2, 100] {
        let result = env.state.ledger.submit(TargetType::Post, "p1", "voter-a", bad).await;
        assert!(matches!(result, Err(Error::InvalidVoteValue(v)) if v == bad));
    }

    let agg = env.state.ledger.get_aggregate(TargetType::Post, "p1").await.unwrap();
    assert_eq!((agg.upvotes, agg.downvotes), (0, 0));
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vote_records")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(records, 0);
}

#[tokio::test]
async fn test_unknown_target_writes_nothing() {
    let env = setup().await;
    seed_target(&env.pool, TargetType::Post, "p1").await;

    let result = env.state.ledger.submit(TargetType::Post, "missing", "voter-a", 1).await;
    assert!(matches!(result, Err(Error::InvalidTarget(_))));

    // Same id, wrong type
    let result = env.state.ledger.submit(TargetType::Comment, "p1", "voter-a", 1).await;
    assert!(matches!(result, Err(Error::InvalidTarget(_))));

    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vote_records")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(records, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_first_votes_by_one_voter() {
    let env = setup().await;
    seed_target(&env.pool, TargetType::Post, "p1").await;

    let mut set = JoinSet::new();
    for _ in 0..8 {
        let ledger = env.state.ledger.clone();
        set.spawn(async move { ledger.submit(TargetType::Post, "p1", "voter-a", 1).await });
    }
    while let Some(result) = set.join_next().await {
        result.unwrap().unwrap();
    }

    // Eight identical toggles from one voter: cast, cancel, ... ends cancelled
    let agg = env.state.ledger.get_aggregate(TargetType::Post, "p1").await.unwrap();
    assert_eq!((agg.upvotes, agg.downvotes), (0, 0));
    assert_eq!(sum_live_votes(&env.pool, TargetType::Post, "p1").await.unwrap(), 0);

    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vote_records")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(records, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_votes_by_many_voters() {
    let env = setup().await;
    seed_target(&env.pool, TargetType::Post, "p1").await;

    let mut set = JoinSet::new();
    for i in 0..40 {
        let ledger = env.state.ledger.clone();
        let vote = if i % 4 == 0 { -1 } else { 1 };
        set.spawn(async move { ledger.submit(TargetType::Post, "p1", &format!("voter-{}", i), vote).await });
    }
    while let Some(result) = set.join_next().await {
        result.unwrap().unwrap();
    }

    let agg = env.state.ledger.get_aggregate(TargetType::Post, "p1").await.unwrap();
    assert_eq!((agg.upvotes, agg.downvotes), (30, 10));
    assert_eq!(sum_live_votes(&env.pool, TargetType::Post, "p1").await.unwrap(), 20);
}
