//! Target ledger: applies vote transitions to durable counters
//!
//! Each submission runs as one transaction:
//! 1. lock the target row (first statement is a write, so SQLite hands this
//!    transaction the write lock before anything is read)
//! 2. read the voter's current record
//! 3. decide the transition
//! 4. create/update/delete the record
//! 5. apply the counter delta in storage (`count = count + Δ`)
//!
//! Holding the write lock from step 1 serializes the read-decide-write per
//! voter and target, so two simultaneous first votes cannot both see "no
//! record". Lock contention past the busy timeout replays the whole
//! transaction with backoff.

use sqlx::SqlitePool;
use tally_common::db::{begin_monitored, retry_on_lock};
use tally_common::time::now_millis;
use tally_common::{Error, Result};
use tracing::{debug, info};

use super::transition::{decide, RecordEffect, VoteChoice};
use crate::db::{targets, votes};
use crate::models::{TargetAggregate, TargetType, VoteKey, VoteReceipt};

#[derive(Clone)]
pub struct TargetLedger {
    db: SqlitePool,
    max_lock_wait_ms: u64,
}

impl TargetLedger {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self { db, max_lock_wait_ms }
    }

    /// Apply `vote` (+1 / −1) by `voter_id` to a target
    ///
    /// Errors: [`Error::InvalidVoteValue`] for any other value and
    /// [`Error::InvalidTarget`] for an unknown target; neither writes anything.
    pub async fn submit(
        &self,
        target_type: TargetType,
        target_id: &str,
        voter_id: &str,
        vote: i64,
    ) -> Result<VoteReceipt> {
        let choice = VoteChoice::try_from(vote)?;
        let key = VoteKey::new(voter_id, target_type, target_id);
        let key = &key;

        let receipt = retry_on_lock("ledger::submit", self.max_lock_wait_ms, move || {
            self.submit_once(key, choice)
        })
        .await?;

        info!(
            voter_id,
            target_type = %target_type,
            target_id,
            upvotes = receipt.aggregate.upvotes,
            downvotes = receipt.aggregate.downvotes,
            my_vote = ?receipt.my_vote,
            "Vote applied"
        );

        Ok(receipt)
    }

    async fn submit_once(&self, key: &VoteKey, choice: VoteChoice) -> Result<VoteReceipt> {
        let mut tx = begin_monitored(&self.db, "ledger::submit").await?;

        if !targets::lock_target(tx.conn(), key.target_type, &key.target_id).await? {
            tx.rollback().await?;
            return Err(Error::InvalidTarget(format!(
                "{} '{}' does not exist",
                key.target_type, key.target_id
            )));
        }

        let current = votes::find_vote(tx.conn(), key).await?;
        let transition = decide(current, choice);
        debug!(?current, ?transition, "Vote transition decided");

        match transition.record_effect() {
            RecordEffect::Create(vote) | RecordEffect::Update(vote) => {
                votes::upsert_vote(tx.conn(), key, vote, now_millis()).await?
            }
            RecordEffect::Delete => votes::delete_vote(tx.conn(), key).await?,
        }

        targets::apply_delta(tx.conn(), key.target_type, &key.target_id, transition.delta()).await?;

        let aggregate = targets::get_aggregate(tx.conn(), key.target_type, &key.target_id)
            .await?
            .ok_or_else(|| Error::Internal(format!("target {} vanished mid-transaction", key.target_id)))?;

        tx.commit().await?;

        Ok(VoteReceipt {
            aggregate,
            my_vote: transition.resulting_vote(),
        })
    }

    /// Current counters of a target
    pub async fn get_aggregate(&self, target_type: TargetType, target_id: &str) -> Result<TargetAggregate> {
        targets::get_aggregate(&self.db, target_type, target_id)
            .await?
            .ok_or_else(|| Error::InvalidTarget(format!("{} '{}' does not exist", target_type, target_id)))
    }

    /// The voter's standing vote on a target, if any
    pub async fn current_vote(&self, key: &VoteKey) -> Result<Option<VoteChoice>> {
        votes::find_vote(&self.db, key).await
    }
}
