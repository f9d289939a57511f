//! Database initialization
//!
//! Opens (or creates) the SQLite ledger database and creates every table the
//! service needs. Table creation is idempotent, so every start runs it.

use crate::config::StorageConfig;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Current schema version recorded in `schema_version`
pub const SCHEMA_VERSION: i64 = 1;

/// Open or create the database at `db_path` and ensure the schema exists
pub async fn init_database(db_path: &Path, storage: &StorageConfig) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them,
    // not only the one that happens to run a PRAGMA statement.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(storage.busy_timeout());

    let pool = SqlitePoolOptions::new()
        .max_connections(storage.max_connections.max(1))
        .acquire_timeout(storage.acquire_timeout())
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    info!(
        busy_timeout_ms = storage.busy_timeout_ms,
        max_connections = storage.max_connections,
        "Database ready"
    );

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_community_targets_table(pool).await?;
    create_vote_records_table(pool).await?;
    create_elections_table(pool).await?;
    create_candidates_table(pool).await?;
    create_ballot_tallies_table(pool).await?;
    create_voter_election_status_table(pool).await?;
    create_submission_samples_table(pool).await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_community_targets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS community_targets (
            target_type TEXT NOT NULL CHECK (target_type IN ('post', 'comment')),
            target_id TEXT NOT NULL,
            author_id TEXT NOT NULL,
            parent_id TEXT,
            title TEXT,
            body TEXT NOT NULL,
            upvote_count INTEGER NOT NULL DEFAULT 0,
            downvote_count INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (target_type, target_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vote_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vote_records (
            voter_id TEXT NOT NULL,
            target_type TEXT NOT NULL,
            target_id TEXT NOT NULL,
            vote INTEGER NOT NULL CHECK (vote IN (1, -1)),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (voter_id, target_type, target_id),
            FOREIGN KEY (target_type, target_id)
                REFERENCES community_targets(target_type, target_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_vote_records_target ON vote_records(target_type, target_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_elections_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elections (
            sg_id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_candidates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS candidates (
            sg_id TEXT NOT NULL REFERENCES elections(sg_id) ON DELETE CASCADE,
            candidate_id TEXT NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (sg_id, candidate_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_ballot_tallies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ballot_tallies (
            sg_id TEXT NOT NULL,
            candidate_id TEXT NOT NULL,
            vote_count INTEGER NOT NULL DEFAULT 0,
            percentage REAL NOT NULL DEFAULT 0.0,
            PRIMARY KEY (sg_id, candidate_id),
            FOREIGN KEY (sg_id, candidate_id)
                REFERENCES candidates(sg_id, candidate_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_voter_election_status_table(pool: &SqlitePool) -> Result<()> {
    // Scoped per election: one row per (voter, election), never a global flag
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS voter_election_status (
            voter_id TEXT NOT NULL,
            sg_id TEXT NOT NULL REFERENCES elections(sg_id) ON DELETE CASCADE,
            voted_at INTEGER NOT NULL,
            PRIMARY KEY (voter_id, sg_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submission_samples_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submission_samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            author_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            normalized_text TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_submission_samples_author \
         ON submission_samples(author_id, kind, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
