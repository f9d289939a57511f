//! Rolling submission log read by the abuse guard

use async_trait::async_trait;
use sqlx::{Executor, Sqlite, SqlitePool};
use tally_common::Result;

use crate::guard::SubmissionSource;
use crate::models::{SubmissionSample, TargetType};

pub async fn record_sample<'e, E>(executor: E, sample: &SubmissionSample) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO submission_samples (author_id, kind, normalized_text, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&sample.author_id)
    .bind(sample.kind.as_str())
    .bind(&sample.normalized_text)
    .bind(sample.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Samples by one author of one kind at or after `since` (Unix ms), newest first
pub async fn samples_since<'e, E>(
    executor: E,
    author_id: &str,
    kind: TargetType,
    since: i64,
) -> Result<Vec<SubmissionSample>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT normalized_text, created_at
        FROM submission_samples
        WHERE author_id = ? AND kind = ? AND created_at >= ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(author_id)
    .bind(kind.as_str())
    .bind(since)
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(normalized_text, created_at)| SubmissionSample {
            author_id: author_id.to_string(),
            kind,
            normalized_text,
            created_at,
        })
        .collect())
}

/// Delete samples older than `cutoff` (Unix ms); returns rows removed
pub async fn prune_before<'e, E>(executor: E, cutoff: i64) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM submission_samples WHERE created_at < ?")
        .bind(cutoff)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// [`SubmissionSource`] backed by the `submission_samples` table
#[derive(Clone)]
pub struct SqliteSubmissionLog {
    db: SqlitePool,
}

impl SqliteSubmissionLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubmissionSource for SqliteSubmissionLog {
    async fn submissions_since(
        &self,
        author_id: &str,
        kind: TargetType,
        since: i64,
    ) -> Result<Vec<SubmissionSample>> {
        samples_since(&self.db, author_id, kind, since).await
    }
}
