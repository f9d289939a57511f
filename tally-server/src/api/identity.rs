//! Voter identity extraction
//!
//! Authentication happens upstream; the verified voter id is forwarded in the
//! `X-Voter-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const VOTER_ID_HEADER: &str = "x-voter-id";

/// Authenticated voter making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterId(pub String);

impl VoterId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for VoterId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(VOTER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized(format!("{} header required", VOTER_ID_HEADER)))?;

        let voter = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized(format!("{} is not valid text", VOTER_ID_HEADER)))?
            .trim();

        if voter.is_empty() {
            return Err(ApiError::Unauthorized(format!("{} is blank", VOTER_ID_HEADER)));
        }

        Ok(VoterId(voter.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract(header: Option<&str>) -> Result<VoterId, ApiError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(VOTER_ID_HEADER, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        VoterId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_header_present() {
        assert_eq!(extract(Some(" voter-7 ")).await.unwrap(), VoterId("voter-7".into()));
    }

    #[tokio::test]
    async fn test_missing_or_blank_header_is_unauthorized() {
        assert_eq!(extract(None).await.unwrap_err().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(extract(Some("   ")).await.unwrap_err().status(), StatusCode::UNAUTHORIZED);
    }
}
