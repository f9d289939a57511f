//! Instrumented ledger transactions
//!
//! Ledger writes hold the SQLite write lock for the life of their transaction,
//! so long-held transactions show up directly as latency for every other voter.
//! These wrappers log acquisition wait and hold time per call site.

use crate::Result;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::time::Instant;

/// Transaction wrapper that logs how long its connection was held
pub struct MonitoredTransaction {
    tx: Transaction<'static, Sqlite>,
    hold: HoldTimer,
}

impl MonitoredTransaction {
    /// Connection to run statements against inside the transaction
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Commit the transaction and log release timing
    pub async fn commit(self) -> Result<()> {
        let MonitoredTransaction { tx, mut hold } = self;
        tx.commit().await?;
        hold.release("commit");
        Ok(())
    }

    /// Roll back the transaction and log release timing
    pub async fn rollback(self) -> Result<()> {
        let MonitoredTransaction { tx, mut hold } = self;
        tx.rollback().await?;
        hold.release("rollback");
        Ok(())
    }
}

struct HoldTimer {
    caller: &'static str,
    acquired_at: Instant,
    released: bool,
}

impl HoldTimer {
    fn release(&mut self, how: &'static str) {
        self.released = true;
        let held_ms = self.acquired_at.elapsed().as_millis();
        if held_ms > 2000 {
            tracing::warn!(
                caller = self.caller,
                held_ms,
                how,
                "LONG TRANSACTION - write lock held for extended period"
            );
        } else if held_ms > 500 {
            tracing::info!(
                caller = self.caller,
                held_ms,
                how,
                "Transaction held longer than expected (>500ms)"
            );
        } else {
            tracing::debug!(caller = self.caller, held_ms, how, "Connection released");
        }
    }
}

impl Drop for HoldTimer {
    fn drop(&mut self) {
        if !self.released {
            // sqlx rolls back the inner transaction when it is dropped
            tracing::debug!(
                caller = self.caller,
                held_ms = self.acquired_at.elapsed().as_millis(),
                "Connection released (drop, rolled back)"
            );
        }
    }
}

/// Begin a monitored transaction, logging pool wait time
///
/// ```ignore
/// let mut tx = begin_monitored(&pool, "ledger::submit").await?;
/// sqlx::query("...").execute(tx.conn()).await?;
/// tx.commit().await?;
/// ```
pub async fn begin_monitored(pool: &SqlitePool, caller: &'static str) -> Result<MonitoredTransaction> {
    let start = Instant::now();

    let tx = pool.begin().await?;

    let wait_ms = start.elapsed().as_millis();
    if wait_ms > 1000 {
        tracing::warn!(
            caller,
            wait_ms,
            "SLOW CONNECTION ACQUISITION - Pool may be saturated"
        );
    } else {
        tracing::trace!(caller, wait_ms, "Connection acquired");
    }

    Ok(MonitoredTransaction {
        tx,
        hold: HoldTimer {
            caller,
            acquired_at: Instant::now(),
            released: false,
        },
    })
}
