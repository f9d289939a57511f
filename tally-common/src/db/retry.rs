//! Bounded retry for transient lock contention
//!
//! Ledger transactions take the SQLite write lock on their first statement.
//! When another writer holds it past the busy timeout, SQLite reports
//! `database is locked`; the whole transaction is then replayed with
//! exponential backoff until `max_wait_ms` has elapsed.

use crate::{Error, Result};
use std::time::{Duration, Instant};

/// Retry an operation while it fails with lock contention
///
/// **Backoff:** starts at 10ms, doubles per attempt, capped at 1000ms.
/// Any other error is returned immediately. Once the budget is spent the last
/// contention error is replaced by [`Error::StorageContention`].
pub async fn retry_on_lock<F, Fut, T>(
    operation_name: &str,
    max_wait_ms: u64,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let start_time = Instant::now();
    let max_duration = Duration::from_millis(max_wait_ms);
    let mut attempt: u32 = 0;
    let mut backoff_ms = 10u64;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    let elapsed_ms = start_time.elapsed().as_millis();
                    if elapsed_ms > 2000 {
                        tracing::warn!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms,
                            "Operation succeeded after significant retry period (>2s)"
                        );
                    } else {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            elapsed_ms,
                            "Operation succeeded after retry"
                        );
                    }
                }
                return Ok(result);
            }
            Err(err) if !err.is_lock_contention() => return Err(err),
            Err(err) => {
                let elapsed = start_time.elapsed();

                if elapsed >= max_duration {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = elapsed.as_millis(),
                        max_wait_ms,
                        error = %err,
                        "Lock contention persisted past retry budget"
                    );
                    return Err(Error::StorageContention {
                        operation: operation_name.to_string(),
                        attempts: attempt,
                        elapsed_ms: elapsed.as_millis(),
                    });
                }

                let sleep_ms = backoff_ms
                    .min(1000)
                    .min(max_duration.saturating_sub(elapsed).as_millis() as u64)
                    .max(1);

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = elapsed.as_millis(),
                    backoff_ms = sleep_ms,
                    "Database locked, will retry after backoff"
                );

                tokio::time::sleep(Duration::from_millis(sleep_ms)).await;
                backoff_ms = (backoff_ms * 2).min(1000);
            }
        }
    }
}
