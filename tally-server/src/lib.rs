//! tally-server library - community votes, election ballots and abuse screening
//!
//! The ledger keeps per-target up/down counters consistent with the stored
//! vote records, the ballot box enforces one ballot per voter per election,
//! and the reconciler keeps derived percentage shares in step with the
//! counts. Content submissions pass the abuse guard and, for comments, the
//! moderation guard before they become vote targets.

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tally_common::config::TomlConfig;
use tally_common::time::window_start_millis;
use tally_common::Result;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod api;
pub mod db;
pub mod election;
pub mod error;
pub mod guard;
pub mod models;
pub mod scheduler;
pub mod similarity;
pub mod voting;

use db::SqliteSubmissionLog;
use election::{BallotBox, ParticipationPolicy, TallyReconciler};
use guard::{AbuseGuard, ContentModerationGuard, PerspectiveClient, ToxicityScorer};
use scheduler::{spawn_periodic, PeriodicHandle};
use voting::{CommunityBoard, TargetLedger};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub ledger: TargetLedger,
    pub board: Arc<CommunityBoard>,
    pub ballots: BallotBox,
    pub reconciler: TallyReconciler,
    pub abuse: Arc<AbuseGuard>,
    pub moderation: Arc<ContentModerationGuard>,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the ledger, guards and election services over one pool
    pub fn new(db: SqlitePool, config: &TomlConfig) -> Result<Self> {
        let scorer = PerspectiveClient::from_config(&config.moderation)?
            .map(|client| Arc::new(client) as Arc<dyn ToxicityScorer>);
        if scorer.is_some() {
            info!("Toxicity scoring enabled");
        }
        Ok(Self::with_scorer(db, config, scorer))
    }

    /// Same as [`AppState::new`] with an explicit toxicity scorer
    pub fn with_scorer(db: SqlitePool, config: &TomlConfig, scorer: Option<Arc<dyn ToxicityScorer>>) -> Self {
        let max_lock_wait_ms = config.storage.max_lock_wait_ms;

        let abuse = Arc::new(AbuseGuard::new(
            Arc::new(SqliteSubmissionLog::new(db.clone())),
            config.abuse.clone(),
        ));
        let moderation = Arc::new(ContentModerationGuard::new(&config.moderation, scorer));

        let ledger = TargetLedger::new(db.clone(), max_lock_wait_ms);
        let board = Arc::new(CommunityBoard::new(
            db.clone(),
            Arc::clone(&abuse),
            Arc::clone(&moderation),
            max_lock_wait_ms,
        ));

        let reconciler = TallyReconciler::new(db.clone(), max_lock_wait_ms, config.reconcile.run_timeout());
        let ballots = BallotBox::new(
            db.clone(),
            reconciler.clone(),
            ParticipationPolicy::new(config.election.full_turnout_votes),
            max_lock_wait_ms,
        );

        Self {
            db,
            ledger,
            board,
            ballots,
            reconciler,
            abuse,
            moderation,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let community = Router::new()
        .route("/api/community/votes", post(api::submit_vote))
        .route("/api/community/targets/:target_type/:target_id", get(api::get_target))
        .route("/api/community/posts", post(api::create_post))
        .route("/api/community/comments", post(api::create_comment));

    let elections = Router::new()
        .route("/api/elections", post(api::register_election))
        .route("/api/elections/:sg_id/close", post(api::close_election))
        .route("/api/elections/:sg_id/ballots", post(api::submit_ballot))
        .route("/api/elections/:sg_id/stats", get(api::get_stats));

    let guards = Router::new()
        .route("/api/abuse/check", post(api::check_abuse))
        .route("/api/moderation/check", post(api::check_moderation));

    Router::new()
        .merge(community)
        .merge(elections)
        .merge(guards)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Timers started alongside the HTTP server
pub struct BackgroundTasks {
    pub reconcile: PeriodicHandle,
    pub prune: PeriodicHandle,
}

impl BackgroundTasks {
    pub fn shutdown(&self) {
        self.reconcile.shutdown();
        self.prune.shutdown();
    }
}

/// Start the reconciliation and submission-log pruning timers
pub fn start_background_tasks(state: &AppState, config: &TomlConfig) -> BackgroundTasks {
    let run_timeout = config.reconcile.run_timeout();

    let reconciler = state.reconciler.clone();
    let reconcile = spawn_periodic("tally_reconcile", config.reconcile.interval(), run_timeout, move || {
        let reconciler = reconciler.clone();
        async move { reconciler.reconcile_active().await.map(|_| ()) }
    });

    let pool = state.db.clone();
    let retention = config.abuse.retention();
    let prune = spawn_periodic("submission_prune", config.reconcile.interval(), run_timeout, move || {
        let pool = pool.clone();
        async move {
            let cutoff = window_start_millis(Utc::now(), retention);
            let removed = db::submissions::prune_before(&pool, cutoff).await?;
            if removed > 0 {
                info!(removed, "Pruned expired submission samples");
            }
            Ok::<(), tally_common::Error>(())
        }
    });

    BackgroundTasks { reconcile, prune }
}
