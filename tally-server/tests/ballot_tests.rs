//! Integration tests for election ballots and percentage reconciliation

mod common;

use common::{election, settle, setup, setup_with, test_config};
use tally_common::Error;
use tally_server::db::ballots::{get_tally, list_tallies};
use std::time::Duration;
use tally_server::election::{BallotBox, ParticipationPolicy, TallyReconciler};
use tokio::task::JoinSet;

#[tokio::test]
async fn test_register_election_lists_candidates_with_zero_counts() {
    let env = setup().await;
    let stats = env.state.ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();

    assert!(stats.active);
    assert_eq!(stats.total_votes, 0);
    assert_eq!(stats.participation, 0.0);
    assert_eq!(stats.votes.len(), 2);
    assert!(stats.votes.iter().all(|v| v.vote_count == 0 && v.percentage == 0.0));
}

#[tokio::test]
async fn test_register_rejects_blank_input() {
    let env = setup().await;
    let ballots = &env.state.ballots;

    assert!(matches!(
        ballots.register_election(&election(" ", &["a"])).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        ballots.register_election(&election("sg-1", &[])).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        ballots.register_election(&election("sg-1", &[""])).await,
        Err(Error::InvalidInput(_))
    ));
}

#[tokio::test]
async fn test_first_ballot_creates_tally() {
    let env = setup().await;
    env.state.ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();

    let stats = env.state.ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();
    assert_eq!(stats.sg_id, "sg-1");
    assert_eq!(stats.total_votes, 1);

    let a = stats.votes.iter().find(|v| v.candidate_id == "a").unwrap();
    assert_eq!(a.vote_count, 1);
    assert_eq!(a.percentage, 100.0);

    let tallies = list_tallies(&env.pool, "sg-1").await.unwrap();
    assert_eq!(tallies.len(), 1);
    assert_eq!(tallies[0].vote_count, 1);

    // No tally row until a candidate receives a ballot
    assert!(get_tally(&env.pool, "sg-1", "b").await.unwrap().is_none());
    assert_eq!(get_tally(&env.pool, "sg-1", "a").await.unwrap().unwrap().vote_count, 1);
}

#[tokio::test]
async fn test_second_ballot_in_same_election_rejected() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();

    ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();
    let result = ballots.submit_ballot("sg-1", "b", "voter-1").await;
    assert!(matches!(result, Err(Error::AlreadyVoted { .. })));

    let stats = ballots.election_stats("sg-1").await.unwrap();
    assert_eq!(stats.total_votes, 1);
}

#[tokio::test]
async fn test_one_ballot_per_election_not_per_voter() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a"])).await.unwrap();
    ballots.register_election(&election("sg-2", &["x"])).await.unwrap();

    ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();
    ballots.submit_ballot("sg-2", "x", "voter-1").await.unwrap();

    assert!(ballots.has_voted("voter-1", "sg-1").await.unwrap());
    assert!(ballots.has_voted("voter-1", "sg-2").await.unwrap());
    assert!(!ballots.has_voted("voter-2", "sg-1").await.unwrap());
}

#[tokio::test]
async fn test_unknown_candidate_or_election_rejected() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a"])).await.unwrap();

    assert!(matches!(
        ballots.submit_ballot("sg-1", "zzz", "voter-1").await,
        Err(Error::InvalidCandidate { .. })
    ));
    assert!(matches!(
        ballots.submit_ballot("no-such", "a", "voter-1").await,
        Err(Error::InvalidCandidate { .. })
    ));

    // A rejected ballot does not use up the voter's ballot
    ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();
}

#[tokio::test]
async fn test_closed_election_rejects_ballots_but_keeps_stats() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();
    ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();

    let closed = ballots.close_election("sg-1").await.unwrap();
    assert!(!closed.active);
    assert_eq!(closed.total_votes, 1);

    assert!(matches!(
        ballots.submit_ballot("sg-1", "b", "voter-2").await,
        Err(Error::ElectionClosed(_))
    ));
    assert!(!ballots.has_voted("voter-2", "sg-1").await.unwrap());

    assert!(matches!(ballots.close_election("no-such").await, Err(Error::NotFound(_))));
    assert!(matches!(ballots.election_stats("no-such").await, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ballots_lose_no_updates() {
    let env = setup().await;
    env.state.ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();

    const N: usize = 60;
    let mut set = JoinSet::new();
    for i in 0..N {
        let ballots = env.state.ballots.clone();
        set.spawn(async move { ballots.submit_ballot("sg-1", "a", &format!("voter-{}", i)).await });
    }
    while let Some(result) = set.join_next().await {
        result.unwrap().unwrap();
    }

    settle(&env.state).await;
    env.state.reconciler.recompute_percentages("sg-1").await.unwrap();

    let stats = env.state.ballots.election_stats("sg-1").await.unwrap();
    let a = stats.votes.iter().find(|v| v.candidate_id == "a").unwrap();
    assert_eq!(a.vote_count, N as i64);
    assert_eq!(a.percentage, 100.0);

    let marked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM voter_election_status WHERE sg_id = 'sg-1'")
        .fetch_one(&env.pool)
        .await
        .unwrap();
    assert_eq!(marked, N as i64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_duplicate_ballots_count_once() {
    let env = setup().await;
    env.state.ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();

    let mut set = JoinSet::new();
    for i in 0..10 {
        let ballots = env.state.ballots.clone();
        let candidate = if i % 2 == 0 { "a" } else { "b" };
        set.spawn(async move { ballots.submit_ballot("sg-1", candidate, "voter-1").await });
    }

    let mut accepted = 0;
    while let Some(result) = set.join_next().await {
        match result.unwrap() {
            Ok(_) => accepted += 1,
            Err(Error::AlreadyVoted { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(accepted, 1);

    let stats = env.state.ballots.election_stats("sg-1").await.unwrap();
    assert_eq!(stats.total_votes, 1);
}

#[tokio::test]
async fn test_recompute_is_idempotent_and_sums_to_hundred() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a", "b", "c"])).await.unwrap();

    for (i, candidate) in ["a", "a", "b", "c", "c", "c", "a"].iter().enumerate() {
        ballots.submit_ballot("sg-1", candidate, &format!("voter-{}", i)).await.unwrap();
    }
    settle(&env.state).await;

    let first = env.state.reconciler.recompute_percentages("sg-1").await.unwrap();
    let second = env.state.reconciler.recompute_percentages("sg-1").await.unwrap();
    assert_eq!(first, second);

    let sum: f64 = first.iter().map(|r| r.percentage).sum();
    assert!((sum - 100.0).abs() <= 0.15, "sum was {}", sum);

    let stored = list_tallies(&env.pool, "sg-1").await.unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn test_post_ballot_recompute_updates_stored_shares() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();

    ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();
    ballots.submit_ballot("sg-1", "b", "voter-2").await.unwrap();
    ballots.submit_ballot("sg-1", "b", "voter-3").await.unwrap();
    settle(&env.state).await;

    // Each request either ran or was folded into a follow-up run
    let stats = ballots.election_stats("sg-1").await.unwrap();
    let share = |id: &str| stats.votes.iter().find(|v| v.candidate_id == id).unwrap().percentage;
    assert_eq!(share("a"), 33.3);
    assert_eq!(share("b"), 66.7);
}

#[tokio::test]
async fn test_reconcile_active_skips_closed_elections() {
    let env = setup().await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("open", &["a"])).await.unwrap();
    ballots.register_election(&election("closed", &["a"])).await.unwrap();
    ballots.close_election("closed").await.unwrap();

    assert_eq!(env.state.reconciler.reconcile_active().await.unwrap(), 1);
}

#[tokio::test]
async fn test_participation_saturates() {
    let mut config = test_config();
    config.election.full_turnout_votes = 4;
    let env = setup_with(config).await;
    let ballots = &env.state.ballots;
    ballots.register_election(&election("sg-1", &["a"])).await.unwrap();

    let stats = ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();
    assert_eq!(stats.participation, 25.0);

    for i in 2..=6 {
        ballots.submit_ballot("sg-1", "a", &format!("voter-{}", i)).await.unwrap();
    }
    let stats = ballots.election_stats("sg-1").await.unwrap();
    assert_eq!(stats.participation, 100.0);
}

#[tokio::test]
async fn test_close_election_bounds_final_recompute() {
    let env = setup().await;

    // A run timeout no recompute can meet: closing must still succeed
    let reconciler = TallyReconciler::new(env.pool.clone(), 30_000, Duration::ZERO);
    let ballots = BallotBox::new(env.pool.clone(), reconciler.clone(), ParticipationPolicy::default(), 30_000);
    ballots.register_election(&election("sg-1", &["a", "b"])).await.unwrap();
    ballots.submit_ballot("sg-1", "a", "voter-1").await.unwrap();

    let closed = ballots.close_election("sg-1").await.unwrap();
    assert!(!closed.active);
    assert_eq!(closed.total_votes, 1);

    // With a real budget the bounded run completes and reports its rows
    let rows = env.state.reconciler.recompute_bounded("sg-1").await.unwrap().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].percentage, 100.0);
}
