//! Periodic background jobs
//!
//! Each job runs on its own interval timer. A tick that finds the previous
//! run of the same job still going is skipped, so runs of one job never
//! overlap within a process. Every run is bounded by a timeout.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct JobCounters {
    running: AtomicBool,
    started: AtomicU64,
    skipped: AtomicU64,
}

/// Handle to a spawned periodic job
pub struct PeriodicHandle {
    name: &'static str,
    counters: Arc<JobCounters>,
    task: JoinHandle<()>,
}

impl PeriodicHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs started so far
    pub fn runs_started(&self) -> u64 {
        self.counters.started.load(Ordering::SeqCst)
    }

    /// Ticks skipped because the previous run was still going
    pub fn runs_skipped(&self) -> u64 {
        self.counters.skipped.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.counters.running.load(Ordering::SeqCst)
    }

    /// Stop the timer; a run already in progress finishes on its own
    pub fn shutdown(&self) {
        info!(job = self.name, "Stopping periodic job");
        self.task.abort();
    }
}

impl Drop for PeriodicHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn `job` every `period`, first run after one period
///
/// Each run is cut off after `run_timeout`. Failures are logged and the
/// timer keeps going.
pub fn spawn_periodic<F, Fut, E>(
    name: &'static str,
    period: Duration,
    run_timeout: Duration,
    job: F,
) -> PeriodicHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let counters = Arc::new(JobCounters::default());

    info!(
        job = name,
        period_ms = period.as_millis(),
        timeout_ms = run_timeout.as_millis(),
        "Starting periodic job"
    );

    let loop_counters = Arc::clone(&counters);
    let task = tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        timer.tick().await;

        loop {
            timer.tick().await;

            if loop_counters.running.swap(true, Ordering::SeqCst) {
                loop_counters.skipped.fetch_add(1, Ordering::SeqCst);
                warn!(job = name, "Previous run still in progress, skipping tick");
                continue;
            }
            loop_counters.started.fetch_add(1, Ordering::SeqCst);

            let run_counters = Arc::clone(&loop_counters);
            let fut = job();
            tokio::spawn(async move {
                debug!(job = name, "Periodic run started");
                match tokio::time::timeout(run_timeout, fut).await {
                    Ok(Ok(())) => debug!(job = name, "Periodic run finished"),
                    Ok(Err(e)) => warn!(job = name, error = %e, "Periodic run failed"),
                    Err(_) => warn!(
                        job = name,
                        timeout_ms = run_timeout.as_millis(),
                        "Periodic run timed out"
                    ),
                }
                run_counters.running.store(false, Ordering::SeqCst);
            });
        }
    });

    PeriodicHandle { name, counters, task }
}
