//! HTTP error mapping for the tally service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tally_common::Error;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request carried no voter identity (401)
    #[error("Missing voter identity: {0}")]
    Unauthorized(String),

    /// Vote value that is not an integer at all (400)
    #[error("Invalid vote value: {0}")]
    InvalidVote(String),

    /// Ledger, election or guard error
    #[error(transparent)]
    Tally(#[from] Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::InvalidVote(_) => (StatusCode::BAD_REQUEST, "INVALID_VOTE_VALUE"),
            ApiError::Tally(err) => match err {
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                Error::InvalidTarget(_) => (StatusCode::BAD_REQUEST, "INVALID_TARGET"),
                Error::InvalidVoteValue(_) => (StatusCode::BAD_REQUEST, "INVALID_VOTE_VALUE"),
                Error::InvalidCandidate { .. } => (StatusCode::BAD_REQUEST, "INVALID_CANDIDATE"),
                Error::ContentRejected(_) => (StatusCode::BAD_REQUEST, "CONTENT_REJECTED"),
                Error::AlreadyVoted { .. } => (StatusCode::CONFLICT, "ALREADY_VOTED"),
                Error::ElectionClosed(_) => (StatusCode::CONFLICT, "ELECTION_CLOSED"),
                Error::SuspectedAbuse(_) => (StatusCode::TOO_MANY_REQUESTS, "SUSPECTED_ABUSE"),
                Error::StorageContention { .. } => (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_CONTENTION"),
                Error::External(_) => (StatusCode::BAD_GATEWAY, "EXTERNAL_ERROR"),
                Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.parts();

        match &self {
            ApiError::Tally(err) if err.is_validation() => {
                tracing::debug!(code = error_code, error = %self, "Request rejected");
            }
            _ if status.is_server_error() => {
                tracing::error!(code = error_code, error = %self, "Request failed");
            }
            _ => {}
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
