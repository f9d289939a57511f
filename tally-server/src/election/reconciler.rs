//! Election percentage reconciliation
//!
//! Percentages are derived data: a pure function of the current vote counts.
//! A recompute reads a snapshot of the counts and writes every share back. It
//! is not atomic with concurrent ballot writes, so a share can lag a ballot
//! that lands between the read and the write; the next run (triggered by the
//! next ballot, or by the periodic timer) corrects it. Because the recompute is
//! idempotent, overlapping runs, including runs from several processes
//! sharing the database, are safe.

use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tally_common::db::{begin_monitored, retry_on_lock};
use tally_common::Result;
use tracing::{debug, info, warn};

use super::stats::percentages;
use crate::db::ballots::{self, TallyRow};
use crate::db::elections;

#[derive(Clone)]
pub struct TallyReconciler {
    db: SqlitePool,
    max_lock_wait_ms: u64,
    run_timeout: Duration,
    /// Elections with a post-ballot recompute running; value = rerun requested
    in_flight: Arc<Mutex<HashMap<String, bool>>>,
}

impl TallyReconciler {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64, run_timeout: Duration) -> Self {
        Self {
            db,
            max_lock_wait_ms,
            run_timeout,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Recompute and store the percentage share of every tallied candidate
    pub async fn recompute_percentages(&self, sg_id: &str) -> Result<Vec<TallyRow>> {
        let mut rows = ballots::list_tallies(&self.db, sg_id).await?;
        let counts: Vec<i64> = rows.iter().map(|r| r.vote_count).collect();
        for (row, pct) in rows.iter_mut().zip(percentages(&counts)) {
            row.percentage = pct;
        }

        let updates: Vec<(String, f64)> = rows
            .iter()
            .map(|r| (r.candidate_id.clone(), r.percentage))
            .collect();
        let updates = &updates;

        retry_on_lock("reconciler::write_percentages", self.max_lock_wait_ms, move || async move {
            let mut tx = begin_monitored(&self.db, "reconciler::write_percentages").await?;
            ballots::write_percentages(tx.conn(), sg_id, updates).await?;
            tx.commit().await
        })
        .await?;

        debug!(sg_id, candidates = rows.len(), "Percentages recomputed");
        Ok(rows)
    }

    /// [`Self::recompute_percentages`] bounded by the run timeout
    ///
    /// Returns `Ok(None)` when the run was abandoned; stored shares are then
    /// left for the next run to correct.
    pub async fn recompute_bounded(&self, sg_id: &str) -> Result<Option<Vec<TallyRow>>> {
        match tokio::time::timeout(self.run_timeout, self.recompute_percentages(sg_id)).await {
            Ok(result) => result.map(Some),
            Err(_) => {
                warn!(
                    sg_id,
                    timeout_ms = self.run_timeout.as_millis(),
                    "Recompute timed out"
                );
                Ok(None)
            }
        }
    }

    /// Recompute every active election; returns how many succeeded
    pub async fn reconcile_active(&self) -> Result<usize> {
        let active = elections::list_active_elections(&self.db).await?;
        let mut reconciled = 0;

        for sg_id in &active {
            match self.recompute_percentages(sg_id).await {
                Ok(_) => reconciled += 1,
                Err(e) => warn!(sg_id = %sg_id, error = %e, "Reconciliation failed for election"),
            }
        }

        info!(reconciled, active = active.len(), "Periodic tally reconciliation finished");
        Ok(reconciled)
    }

    /// Ask for a recompute of one election without waiting for it
    ///
    /// While a recompute for the election is running, further requests are
    /// folded into a single follow-up run instead of spawning more tasks.
    pub fn request(&self, sg_id: &str) {
        {
            let mut in_flight = self.lock_in_flight();
            if let Some(rerun) = in_flight.get_mut(sg_id) {
                *rerun = true;
                debug!(sg_id, "Recompute already running, coalesced");
                return;
            }
            in_flight.insert(sg_id.to_string(), false);
        }

        let this = self.clone();
        let sg_id = sg_id.to_string();
        tokio::spawn(async move {
            loop {
                if let Err(e) = this.recompute_bounded(&sg_id).await {
                    warn!(sg_id = %sg_id, error = %e, "Post-ballot recompute failed");
                }
                if !this.finish_run(&sg_id) {
                    break;
                }
            }
        });
    }

    /// Number of elections with a post-ballot recompute still running
    pub fn pending(&self) -> usize {
        self.lock_in_flight().len()
    }

    /// Clear the in-flight mark, or consume a rerun request (returns true)
    fn finish_run(&self, sg_id: &str) -> bool {
        let mut in_flight = self.lock_in_flight();
        match in_flight.get_mut(sg_id) {
            Some(rerun) if *rerun => {
                *rerun = false;
                true
            }
            _ => {
                in_flight.remove(sg_id);
                false
            }
        }
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, bool>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
