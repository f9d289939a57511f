//! Community vote and content endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::identity::VoterId;
use crate::error::{ApiError, ApiResult};
use crate::models::{TargetAggregate, TargetType, VoteReceipt};
use crate::voting::{NewComment, NewPost, SubmittedContent};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub target_type: String,
    pub target_id: String,
    /// Any JSON value; only the integers 1 and -1 are accepted
    pub vote: serde_json::Value,
}

/// POST /api/community/votes
pub async fn submit_vote(
    State(state): State<AppState>,
    voter: VoterId,
    Json(request): Json<VoteRequest>,
) -> ApiResult<Json<VoteReceipt>> {
    let vote = request
        .vote
        .as_i64()
        .ok_or_else(|| ApiError::InvalidVote(request.vote.to_string()))?;
    let target_type: TargetType = request.target_type.parse()?;
    let receipt = state
        .ledger
        .submit(target_type, &request.target_id, voter.as_str(), vote)
        .await?;
    Ok(Json(receipt))
}

/// GET /api/community/targets/:target_type/:target_id
pub async fn get_target(
    State(state): State<AppState>,
    Path((target_type, target_id)): Path<(String, String)>,
) -> ApiResult<Json<TargetAggregate>> {
    let target_type: TargetType = target_type.parse()?;
    Ok(Json(state.ledger.get_aggregate(target_type, &target_id).await?))
}

/// POST /api/community/posts
pub async fn create_post(
    State(state): State<AppState>,
    voter: VoterId,
    Json(post): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<SubmittedContent>)> {
    let created = state.board.create_post(voter.as_str(), post).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /api/community/comments
pub async fn create_comment(
    State(state): State<AppState>,
    voter: VoterId,
    Json(comment): Json<NewComment>,
) -> ApiResult<(StatusCode, Json<SubmittedContent>)> {
    let created = state.board.create_comment(voter.as_str(), comment).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
