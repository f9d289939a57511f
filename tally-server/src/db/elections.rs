//! Election registry, candidates and per-election voter status

use sqlx::{Executor, Sqlite};
use tally_common::Result;

/// Registered election
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ElectionRow {
    pub sg_id: String,
    pub title: String,
    pub active: bool,
}

pub async fn upsert_election<'e, E>(executor: E, sg_id: &str, title: &str, now: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO elections (sg_id, title, active, created_at, updated_at)
        VALUES (?, ?, 1, ?, ?)
        ON CONFLICT(sg_id) DO UPDATE SET
            title = excluded.title,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(sg_id)
    .bind(title)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn upsert_candidate<'e, E>(executor: E, sg_id: &str, candidate_id: &str, name: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO candidates (sg_id, candidate_id, name) VALUES (?, ?, ?)
        ON CONFLICT(sg_id, candidate_id) DO UPDATE SET name = excluded.name
        "#,
    )
    .bind(sg_id)
    .bind(candidate_id)
    .bind(name)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_election<'e, E>(executor: E, sg_id: &str) -> Result<Option<ElectionRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ElectionRow>(
        "SELECT sg_id, title, active FROM elections WHERE sg_id = ?",
    )
    .bind(sg_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Take the write lock on behalf of an election; returns false if unknown
///
/// First statement of a ballot transaction, for the same reason as
/// [`crate::db::targets::lock_target`].
pub async fn lock_election<'e, E>(executor: E, sg_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE elections SET updated_at = updated_at WHERE sg_id = ?")
        .bind(sg_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn set_active<'e, E>(executor: E, sg_id: &str, active: bool, now: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE elections SET active = ?, updated_at = ? WHERE sg_id = ?")
        .bind(active)
        .bind(now)
        .bind(sg_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn list_active_elections<'e, E>(executor: E) -> Result<Vec<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids = sqlx::query_scalar("SELECT sg_id FROM elections WHERE active = 1 ORDER BY sg_id")
        .fetch_all(executor)
        .await?;

    Ok(ids)
}

pub async fn candidate_exists<'e, E>(executor: E, sg_id: &str, candidate_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM candidates WHERE sg_id = ? AND candidate_id = ?")
            .bind(sg_id)
            .bind(candidate_id)
            .fetch_one(executor)
            .await?;

    Ok(count > 0)
}

/// Record that a voter cast their ballot in an election
///
/// Returns false when the voter was already marked for this election.
pub async fn mark_voted<'e, E>(executor: E, voter_id: &str, sg_id: &str, now: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("INSERT OR IGNORE INTO voter_election_status (voter_id, sg_id, voted_at) VALUES (?, ?, ?)")
            .bind(voter_id)
            .bind(sg_id)
            .bind(now)
            .execute(executor)
            .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn has_voted<'e, E>(executor: E, voter_id: &str, sg_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM voter_election_status WHERE voter_id = ? AND sg_id = ?")
            .bind(voter_id)
            .bind(sg_id)
            .fetch_one(executor)
            .await?;

    Ok(count > 0)
}
