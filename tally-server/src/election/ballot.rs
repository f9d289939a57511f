//! Election ballot submission
//!
//! One ballot per voter per election. The ballot transaction locks the
//! election row first, validates the candidate, marks the voter for this
//! election and increments the candidate's tally in a single upsert. The
//! percentage recompute is requested after commit and never delays the
//! response.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tally_common::db::{begin_monitored, retry_on_lock};
use tally_common::time::now_millis;
use tally_common::{Error, Result};
use tracing::info;

use super::reconciler::TallyReconciler;
use super::stats::{CandidateTally, ElectionStats, ParticipationPolicy};
use crate::db::{ballots, elections};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub candidate_id: String,
    pub name: String,
}

/// Election registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSpec {
    pub sg_id: String,
    pub title: String,
    pub candidates: Vec<CandidateSpec>,
}

#[derive(Clone)]
pub struct BallotBox {
    db: SqlitePool,
    reconciler: TallyReconciler,
    policy: ParticipationPolicy,
    max_lock_wait_ms: u64,
}

impl BallotBox {
    pub fn new(
        db: SqlitePool,
        reconciler: TallyReconciler,
        policy: ParticipationPolicy,
        max_lock_wait_ms: u64,
    ) -> Self {
        Self {
            db,
            reconciler,
            policy,
            max_lock_wait_ms,
        }
    }

    /// Create or update an election and its candidates
    pub async fn register_election(&self, spec: &ElectionSpec) -> Result<ElectionStats> {
        if spec.sg_id.trim().is_empty() || spec.title.trim().is_empty() {
            return Err(Error::InvalidInput("sg_id and title must not be blank".to_string()));
        }
        if spec.candidates.is_empty() {
            return Err(Error::InvalidInput("an election needs at least one candidate".to_string()));
        }
        if spec.candidates.iter().any(|c| c.candidate_id.trim().is_empty()) {
            return Err(Error::InvalidInput("candidate_id must not be blank".to_string()));
        }

        retry_on_lock("ballot::register_election", self.max_lock_wait_ms, move || async move {
            let mut tx = begin_monitored(&self.db, "ballot::register_election").await?;
            let now = now_millis();
            elections::upsert_election(tx.conn(), &spec.sg_id, &spec.title, now).await?;
            for candidate in &spec.candidates {
                elections::upsert_candidate(tx.conn(), &spec.sg_id, &candidate.candidate_id, &candidate.name)
                    .await?;
            }
            tx.commit().await
        })
        .await?;

        info!(sg_id = %spec.sg_id, candidates = spec.candidates.len(), "Election registered");
        self.election_stats(&spec.sg_id).await
    }

    /// Stop accepting ballots; stats stay readable
    pub async fn close_election(&self, sg_id: &str) -> Result<ElectionStats> {
        if !elections::set_active(&self.db, sg_id, false, now_millis()).await? {
            return Err(Error::NotFound(format!("election '{}'", sg_id)));
        }
        // Final shares reflect every ballot cast before closing
        self.reconciler.recompute_bounded(sg_id).await?;
        info!(sg_id, "Election closed");
        self.election_stats(sg_id).await
    }

    /// Cast `voter_id`'s single ballot in `sg_id` for `candidate_id`
    ///
    /// Errors: [`Error::InvalidCandidate`] (unknown election or candidate),
    /// [`Error::ElectionClosed`], [`Error::AlreadyVoted`].
    pub async fn submit_ballot(&self, sg_id: &str, candidate_id: &str, voter_id: &str) -> Result<ElectionStats> {
        retry_on_lock("ballot::submit", self.max_lock_wait_ms, || {
            self.submit_once(sg_id, candidate_id, voter_id)
        })
        .await?;

        info!(sg_id, candidate_id, voter_id, "Ballot recorded");

        self.reconciler.request(sg_id);

        // Shares computed from committed counts; stored shares catch up when
        // the requested recompute lands
        let (active, votes) = self.load_tallies(sg_id).await?;
        Ok(ElectionStats::from_counts(sg_id, active, votes, self.policy))
    }

    async fn submit_once(&self, sg_id: &str, candidate_id: &str, voter_id: &str) -> Result<()> {
        let mut tx = begin_monitored(&self.db, "ballot::submit").await?;

        let invalid_candidate = || Error::InvalidCandidate {
            sg_id: sg_id.to_string(),
            candidate_id: candidate_id.to_string(),
        };

        if !elections::lock_election(tx.conn(), sg_id).await? {
            tx.rollback().await?;
            return Err(invalid_candidate());
        }

        let active = elections::get_election(tx.conn(), sg_id)
            .await?
            .map(|e| e.active)
            .unwrap_or(false);
        if !active {
            tx.rollback().await?;
            return Err(Error::ElectionClosed(sg_id.to_string()));
        }

        if !elections::candidate_exists(tx.conn(), sg_id, candidate_id).await? {
            tx.rollback().await?;
            return Err(invalid_candidate());
        }

        if !elections::mark_voted(tx.conn(), voter_id, sg_id, now_millis()).await? {
            tx.rollback().await?;
            return Err(Error::AlreadyVoted {
                voter_id: voter_id.to_string(),
                sg_id: sg_id.to_string(),
            });
        }

        ballots::increment_tally(tx.conn(), sg_id, candidate_id).await?;

        tx.commit().await
    }

    /// Stats as stored: percentages as of the last reconciliation
    pub async fn election_stats(&self, sg_id: &str) -> Result<ElectionStats> {
        let (active, votes) = self.load_tallies(sg_id).await?;
        Ok(ElectionStats::from_stored(sg_id, active, votes, self.policy))
    }

    /// Whether the voter already cast a ballot in this election
    pub async fn has_voted(&self, voter_id: &str, sg_id: &str) -> Result<bool> {
        elections::has_voted(&self.db, voter_id, sg_id).await
    }

    async fn load_tallies(&self, sg_id: &str) -> Result<(bool, Vec<CandidateTally>)> {
        let election = elections::get_election(&self.db, sg_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("election '{}'", sg_id)))?;

        let votes = ballots::list_candidate_tallies(&self.db, sg_id)
            .await?
            .into_iter()
            .map(|row| CandidateTally {
                candidate_id: row.candidate_id,
                name: row.name,
                vote_count: row.vote_count,
                percentage: row.percentage,
            })
            .collect();

        Ok((election.active, votes))
    }
}
