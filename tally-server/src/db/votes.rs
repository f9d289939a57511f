//! Per-voter vote records

use sqlx::{Executor, Sqlite};
use tally_common::Result;

use crate::models::{TargetType, VoteKey};
use crate::voting::VoteChoice;

/// Current vote of a voter on a target, if any
pub async fn find_vote<'e, E>(executor: E, key: &VoteKey) -> Result<Option<VoteChoice>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value: Option<i64> = sqlx::query_scalar(
        "SELECT vote FROM vote_records WHERE voter_id = ? AND target_type = ? AND target_id = ?",
    )
    .bind(&key.voter_id)
    .bind(key.target_type.as_str())
    .bind(&key.target_id)
    .fetch_optional(executor)
    .await?;

    value.map(VoteChoice::try_from).transpose()
}

/// Create the record or overwrite its value
pub async fn upsert_vote<'e, E>(executor: E, key: &VoteKey, choice: VoteChoice, now: i64) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO vote_records (voter_id, target_type, target_id, vote, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(voter_id, target_type, target_id) DO UPDATE SET
            vote = excluded.vote,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&key.voter_id)
    .bind(key.target_type.as_str())
    .bind(&key.target_id)
    .bind(choice.value())
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn delete_vote<'e, E>(executor: E, key: &VoteKey) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM vote_records WHERE voter_id = ? AND target_type = ? AND target_id = ?")
        .bind(&key.voter_id)
        .bind(key.target_type.as_str())
        .bind(&key.target_id)
        .execute(executor)
        .await?;

    Ok(())
}

/// Sum of live vote values on a target (what `upvotes - downvotes` must equal)
pub async fn sum_live_votes<'e, E>(executor: E, target_type: TargetType, target_id: &str) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sum: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(vote), 0) FROM vote_records WHERE target_type = ? AND target_id = ?",
    )
    .bind(target_type.as_str())
    .bind(target_id)
    .fetch_one(executor)
    .await?;

    Ok(sum)
}
