//! Shared fixtures for tally-server integration tests

#![allow(dead_code)]

use sqlx::SqlitePool;
use tally_common::config::TomlConfig;
use tally_common::db::init_database;
use tally_server::db::targets::{insert_target, NewTarget};
use tally_server::election::{CandidateSpec, ElectionSpec};
use tally_server::models::TargetType;
use tally_server::AppState;
use tempfile::TempDir;

/// Temporary database plus fully wired application state
pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub config: TomlConfig,
    pub state: AppState,
}

/// Config tuned for tests: generous lock budgets so stress tests never give up
pub fn test_config() -> TomlConfig {
    let mut config = TomlConfig::default();
    config.storage.busy_timeout_ms = 1_000;
    config.storage.max_lock_wait_ms = 30_000;
    config.storage.acquire_timeout_ms = 30_000;
    config
}

pub async fn setup() -> TestEnv {
    setup_with(test_config()).await
}

pub async fn setup_with(config: TomlConfig) -> TestEnv {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("tally.db"), &config.storage)
        .await
        .expect("Should initialize database");
    let state = AppState::with_scorer(pool.clone(), &config, None);
    TestEnv {
        dir,
        pool,
        config,
        state,
    }
}

/// Insert a vote target directly, bypassing the guards
pub async fn seed_target(pool: &SqlitePool, target_type: TargetType, target_id: &str) {
    insert_target(
        pool,
        &NewTarget {
            target_type,
            target_id,
            author_id: "seed-author",
            parent_id: None,
            title: Some("seed"),
            body: "seed body",
            created_at: 0,
        },
    )
    .await
    .expect("Should insert target");
}

pub fn election(sg_id: &str, candidates: &[&str]) -> ElectionSpec {
    ElectionSpec {
        sg_id: sg_id.to_string(),
        title: format!("Election {}", sg_id),
        candidates: candidates
            .iter()
            .map(|id| CandidateSpec {
                candidate_id: id.to_string(),
                name: format!("Candidate {}", id),
            })
            .collect(),
    }
}

/// Wait until no post-ballot recompute is running
pub async fn settle(state: &AppState) {
    for _ in 0..200 {
        if state.reconciler.pending() == 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("post-ballot recomputes did not settle");
}
