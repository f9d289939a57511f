//! Per-candidate ballot tallies

use sqlx::{Executor, Sqlite, SqliteConnection};
use tally_common::Result;

/// Stored tally row
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct TallyRow {
    pub candidate_id: String,
    pub vote_count: i64,
    pub percentage: f64,
}

/// Candidate with its tally; candidates without ballots read as zero
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CandidateTallyRow {
    pub candidate_id: String,
    pub name: String,
    pub vote_count: i64,
    pub percentage: f64,
}

/// Add one ballot for a candidate, creating the tally row on first vote
///
/// A single upsert statement: the increment happens inside SQLite, so
/// concurrent ballots for the same candidate cannot lose updates.
pub async fn increment_tally<'e, E>(executor: E, sg_id: &str, candidate_id: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO ballot_tallies (sg_id, candidate_id, vote_count, percentage)
        VALUES (?, ?, 1, 0.0)
        ON CONFLICT(sg_id, candidate_id) DO UPDATE SET
            vote_count = vote_count + 1
        "#,
    )
    .bind(sg_id)
    .bind(candidate_id)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn get_tally<'e, E>(executor: E, sg_id: &str, candidate_id: &str) -> Result<Option<TallyRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, TallyRow>(
        "SELECT candidate_id, vote_count, percentage FROM ballot_tallies \
         WHERE sg_id = ? AND candidate_id = ?",
    )
    .bind(sg_id)
    .bind(candidate_id)
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Tally rows that exist for an election (one per candidate that received a ballot)
pub async fn list_tallies<'e, E>(executor: E, sg_id: &str) -> Result<Vec<TallyRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, TallyRow>(
        "SELECT candidate_id, vote_count, percentage FROM ballot_tallies \
         WHERE sg_id = ? ORDER BY candidate_id",
    )
    .bind(sg_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Every registered candidate of an election with its stored tally
pub async fn list_candidate_tallies<'e, E>(executor: E, sg_id: &str) -> Result<Vec<CandidateTallyRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, CandidateTallyRow>(
        r#"
        SELECT c.candidate_id AS candidate_id,
               c.name AS name,
               COALESCE(t.vote_count, 0) AS vote_count,
               COALESCE(t.percentage, 0.0) AS percentage
        FROM candidates c
        LEFT JOIN ballot_tallies t
            ON t.sg_id = c.sg_id AND t.candidate_id = c.candidate_id
        WHERE c.sg_id = ?
        ORDER BY c.candidate_id
        "#,
    )
    .bind(sg_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Overwrite the percentage of each listed candidate
///
/// Only percentages are written; vote counts are left to the increment path.
pub async fn write_percentages(
    conn: &mut SqliteConnection,
    sg_id: &str,
    percentages: &[(String, f64)],
) -> Result<()> {
    for (candidate_id, percentage) in percentages {
        sqlx::query("UPDATE ballot_tallies SET percentage = ? WHERE sg_id = ? AND candidate_id = ?")
            .bind(percentage)
            .bind(sg_id)
            .bind(candidate_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}
