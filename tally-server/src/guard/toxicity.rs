//! HTTP toxicity scorer (Perspective API request format)

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tally_common::config::ModerationConfig;
use tally_common::{Error, Result};
use tracing::debug;

use super::moderation::ToxicityScorer;

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    comment: CommentText<'a>,
    #[serde(rename = "requestedAttributes")]
    requested_attributes: RequestedAttributes,
    #[serde(rename = "doNotStore")]
    do_not_store: bool,
}

#[derive(Debug, Serialize)]
struct CommentText<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct RequestedAttributes {
    #[serde(rename = "TOXICITY")]
    toxicity: Empty,
}

#[derive(Debug, Serialize)]
struct Empty {}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(rename = "attributeScores")]
    attribute_scores: AttributeScores,
}

#[derive(Debug, Deserialize)]
struct AttributeScores {
    #[serde(rename = "TOXICITY")]
    toxicity: AttributeScore,
}

#[derive(Debug, Deserialize)]
struct AttributeScore {
    #[serde(rename = "summaryScore")]
    summary_score: SummaryScore,
}

#[derive(Debug, Deserialize)]
struct SummaryScore {
    value: f64,
}

pub struct PerspectiveClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
    rate_limiter: DefaultDirectRateLimiter,
}

impl PerspectiveClient {
    pub fn new(endpoint: impl Into<String>, config: &ModerationConfig) -> Result<Self> {
        let per_second = NonZeroU32::new(config.toxicity_requests_per_second).unwrap_or(NonZeroU32::MIN);

        let client = reqwest::Client::builder()
            .timeout(config.toxicity_timeout())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            api_key: config.toxicity_api_key.clone(),
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    /// Build a client when `[moderation] toxicity_api_url` is configured
    pub fn from_config(config: &ModerationConfig) -> Result<Option<Self>> {
        match config.toxicity_api_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(Some(Self::new(url.trim(), config)?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ToxicityScorer for PerspectiveClient {
    async fn score(&self, text: &str) -> Result<f64> {
        self.rate_limiter.until_ready().await;

        let body = AnalyzeRequest {
            comment: CommentText { text },
            requested_attributes: RequestedAttributes { toxicity: Empty {} },
            do_not_store: true,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::External(format!("toxicity request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::External(format!(
                "toxicity service returned {}",
                response.status()
            )));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| Error::External(format!("malformed toxicity response: {}", e)))?;

        let score = parsed.attribute_scores.toxicity.summary_score.value;
        debug!(score, "Toxicity scored");
        Ok(score.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let body = AnalyzeRequest {
            comment: CommentText { text: "hi" },
            requested_attributes: RequestedAttributes { toxicity: Empty {} },
            do_not_store: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["comment"]["text"], "hi");
        assert!(json["requestedAttributes"]["TOXICITY"].is_object());
        assert_eq!(json["doNotStore"], true);
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"attributeScores":{"TOXICITY":{"summaryScore":{"value":0.83,"type":"PROBABILITY"}}},"languages":["en"]}"#;
        let parsed: AnalyzeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.attribute_scores.toxicity.summary_score.value, 0.83);
    }

    #[test]
    fn test_from_config_without_url_is_none() {
        let config = ModerationConfig::default();
        assert!(PerspectiveClient::from_config(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_error() {
        let config = ModerationConfig {
            toxicity_timeout_ms: 200,
            ..ModerationConfig::default()
        };
        let client = PerspectiveClient::new("http://127.0.0.1:9/analyze", &config).unwrap();
        assert!(matches!(client.score("hello").await, Err(Error::External(_))));
    }
}
