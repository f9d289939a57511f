//! Standalone guard checks
//!
//! Lets callers screen text before submitting it. Nothing is recorded.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::identity::VoterId;
use crate::error::ApiResult;
use crate::guard::{AbuseReason, ModerationVerdict};
use crate::models::TargetType;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AbuseCheckRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbuseCheckResponse {
    pub suspicious: bool,
    pub reason: Option<AbuseReason>,
    pub recent_count: usize,
    pub max_similarity: f64,
}

/// POST /api/abuse/check
pub async fn check_abuse(
    State(state): State<AppState>,
    voter: VoterId,
    Json(request): Json<AbuseCheckRequest>,
) -> ApiResult<Json<AbuseCheckResponse>> {
    let kind: TargetType = request.kind.parse()?;
    let assessment = state
        .abuse
        .assess(voter.as_str(), kind, request.title.as_deref(), &request.content)
        .await;

    Ok(Json(AbuseCheckResponse {
        suspicious: assessment.is_suspicious(),
        reason: assessment.reason,
        recent_count: assessment.recent_count,
        max_similarity: assessment.max_similarity,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ModerationCheckRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ModerationCheckResponse {
    pub allowed: bool,
    pub reason: Option<String>,
    pub verdict: ModerationVerdict,
}

/// POST /api/moderation/check
pub async fn check_moderation(
    State(state): State<AppState>,
    Json(request): Json<ModerationCheckRequest>,
) -> ApiResult<Json<ModerationCheckResponse>> {
    let verdict = state.moderation.check(&request.text).await;
    Ok(Json(ModerationCheckResponse {
        allowed: verdict.is_allowed(),
        reason: verdict.reason(),
        verdict,
    }))
}
