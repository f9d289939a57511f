//! Community target rows and their up/down counters

use sqlx::{Executor, Sqlite};
use tally_common::Result;

use crate::models::{TargetAggregate, TargetType};
use crate::voting::CounterDelta;

/// New community target (post or comment) with zeroed counters
#[derive(Debug, Clone)]
pub struct NewTarget<'a> {
    pub target_type: TargetType,
    pub target_id: &'a str,
    pub author_id: &'a str,
    pub parent_id: Option<&'a str>,
    pub title: Option<&'a str>,
    pub body: &'a str,
    pub created_at: i64,
}

pub async fn insert_target<'e, E>(executor: E, target: &NewTarget<'_>) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO community_targets (
            target_type, target_id, author_id, parent_id, title, body,
            upvote_count, downvote_count, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?)
        "#,
    )
    .bind(target.target_type.as_str())
    .bind(target.target_id)
    .bind(target.author_id)
    .bind(target.parent_id)
    .bind(target.title)
    .bind(target.body)
    .bind(target.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Take the write lock on behalf of a target and report whether it exists
///
/// Issued as the first statement of a vote transaction: a write statement makes
/// SQLite acquire its write lock up front, so the record lookup that follows
/// cannot interleave with another voter's lookup-then-write.
pub async fn lock_target<'e, E>(executor: E, target_type: TargetType, target_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE community_targets SET upvote_count = upvote_count \
         WHERE target_type = ? AND target_id = ?",
    )
    .bind(target_type.as_str())
    .bind(target_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Apply a signed delta to a target's counters in storage
pub async fn apply_delta<'e, E>(
    executor: E,
    target_type: TargetType,
    target_id: &str,
    delta: CounterDelta,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE community_targets
        SET upvote_count = upvote_count + ?,
            downvote_count = downvote_count + ?
        WHERE target_type = ? AND target_id = ?
        "#,
    )
    .bind(delta.up)
    .bind(delta.down)
    .bind(target_type.as_str())
    .bind(target_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_aggregate<'e, E>(
    executor: E,
    target_type: TargetType,
    target_id: &str,
) -> Result<Option<TargetAggregate>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT upvote_count, downvote_count FROM community_targets \
         WHERE target_type = ? AND target_id = ?",
    )
    .bind(target_type.as_str())
    .bind(target_id)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|(upvotes, downvotes)| TargetAggregate {
        target_type,
        target_id: target_id.to_string(),
        upvotes,
        downvotes,
    }))
}

pub async fn target_exists<'e, E>(executor: E, target_type: TargetType, target_id: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM community_targets WHERE target_type = ? AND target_id = ?",
    )
    .bind(target_type.as_str())
    .bind(target_id)
    .fetch_one(executor)
    .await?;

    Ok(count > 0)
}
