//! Burst-rate and duplicate-content detection
//!
//! A submission is suspicious when either check fires:
//! 1. **Burst:** the author already has `burst_threshold` submissions of the
//!    same kind inside the trailing burst window (60s by default).
//! 2. **Duplicate:** any submission of the same kind inside the trailing
//!    duplicate window (600s by default) scores at or above
//!    `similarity_threshold` against the new text.
//!
//! The log may be slightly stale; the guard is not a security boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tally_common::config::AbuseConfig;
use tally_common::time::window_start_millis;
use tally_common::Result;
use tracing::{debug, warn};

use crate::models::{SubmissionSample, TargetType};
use crate::similarity::similarity;

/// Read-only query port over recent submissions
#[async_trait]
pub trait SubmissionSource: Send + Sync {
    /// Samples by `author_id` of `kind` created at or after `since` (Unix ms)
    async fn submissions_since(
        &self,
        author_id: &str,
        kind: TargetType,
        since: i64,
    ) -> Result<Vec<SubmissionSample>>;
}

/// Which check flagged a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbuseReason {
    Burst,
    Duplicate,
}

/// Outcome of both guard checks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbuseAssessment {
    /// Prior submissions inside the burst window
    pub recent_count: usize,
    /// Highest similarity against the duplicate window (0.0 when empty)
    pub max_similarity: f64,
    pub reason: Option<AbuseReason>,
}

impl AbuseAssessment {
    pub fn is_suspicious(&self) -> bool {
        self.reason.is_some()
    }

    fn clear() -> Self {
        Self {
            recent_count: 0,
            max_similarity: 0.0,
            reason: None,
        }
    }
}

/// Text stored in the submission log and compared by the duplicate check
pub fn normalize_submission(title: Option<&str>, content: &str) -> String {
    let joined = match title {
        Some(title) => format!("{} {}", title, content),
        None => content.to_string(),
    };
    joined
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub struct AbuseGuard {
    source: Arc<dyn SubmissionSource>,
    config: AbuseConfig,
}

impl AbuseGuard {
    pub fn new(source: Arc<dyn SubmissionSource>, config: AbuseConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AbuseConfig {
        &self.config
    }

    /// `true` if either check flags the submission
    pub async fn is_suspicious(
        &self,
        user_id: &str,
        kind: TargetType,
        title: Option<&str>,
        content: &str,
    ) -> bool {
        self.assess(user_id, kind, title, content).await.is_suspicious()
    }

    pub async fn assess(
        &self,
        user_id: &str,
        kind: TargetType,
        title: Option<&str>,
        content: &str,
    ) -> AbuseAssessment {
        self.assess_at(Utc::now(), user_id, kind, title, content).await
    }

    /// Assess as of `now`
    pub async fn assess_at(
        &self,
        now: DateTime<Utc>,
        user_id: &str,
        kind: TargetType,
        title: Option<&str>,
        content: &str,
    ) -> AbuseAssessment {
        let burst_start = window_start_millis(now, self.config.burst_window());
        let duplicate_start = window_start_millis(now, self.config.duplicate_window());

        // One read covering both windows
        let samples = match self
            .source
            .submissions_since(user_id, kind, burst_start.min(duplicate_start))
            .await
        {
            Ok(samples) => samples,
            Err(e) => {
                // Fail open: a heuristic must not block legitimate users
                warn!(user_id, kind = %kind, error = %e, "Submission log unavailable, skipping abuse checks");
                return AbuseAssessment::clear();
            }
        };

        let recent_count = samples
            .iter()
            .filter(|s| s.created_at >= burst_start)
            .count();

        let candidate = normalize_submission(title, content);
        let max_similarity = samples
            .iter()
            .filter(|s| s.created_at >= duplicate_start)
            .map(|s| similarity(&candidate, &s.normalized_text))
            .fold(0.0_f64, f64::max);

        let reason = if recent_count >= self.config.burst_threshold as usize {
            Some(AbuseReason::Burst)
        } else if max_similarity >= self.config.similarity_threshold {
            Some(AbuseReason::Duplicate)
        } else {
            None
        };

        if let Some(reason) = reason {
            debug!(
                user_id,
                kind = %kind,
                recent_count,
                max_similarity,
                ?reason,
                "Submission flagged by abuse guard"
            );
        }

        AbuseAssessment {
            recent_count,
            max_similarity,
            reason,
        }
    }
}
