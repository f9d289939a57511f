//! Election endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::identity::VoterId;
use crate::election::{ElectionSpec, ElectionStats};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotRequest {
    pub candidate_id: String,
}

/// POST /api/elections
pub async fn register_election(
    State(state): State<AppState>,
    caller: VoterId,
    Json(spec): Json<ElectionSpec>,
) -> ApiResult<Json<ElectionStats>> {
    info!(caller = caller.as_str(), sg_id = %spec.sg_id, "Election registration requested");
    Ok(Json(state.ballots.register_election(&spec).await?))
}

/// POST /api/elections/:sg_id/close
pub async fn close_election(
    State(state): State<AppState>,
    caller: VoterId,
    Path(sg_id): Path<String>,
) -> ApiResult<Json<ElectionStats>> {
    info!(caller = caller.as_str(), sg_id = %sg_id, "Election close requested");
    Ok(Json(state.ballots.close_election(&sg_id).await?))
}

/// POST /api/elections/:sg_id/ballots
pub async fn submit_ballot(
    State(state): State<AppState>,
    voter: VoterId,
    Path(sg_id): Path<String>,
    Json(ballot): Json<BallotRequest>,
) -> ApiResult<Json<ElectionStats>> {
    let stats = state
        .ballots
        .submit_ballot(&sg_id, &ballot.candidate_id, voter.as_str())
        .await?;
    Ok(Json(stats))
}

/// GET /api/elections/:sg_id/stats
pub async fn get_stats(
    State(state): State<AppState>,
    Path(sg_id): Path<String>,
) -> ApiResult<Json<ElectionStats>> {
    Ok(Json(state.ballots.election_stats(&sg_id).await?))
}
