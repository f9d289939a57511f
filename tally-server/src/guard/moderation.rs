//! Moderation of conversational content (comments)
//!
//! Two stages: a case-insensitive substring match against a fixed disallowed
//! term list, then, when a scorer is configured, an external toxicity score
//! flagged above the threshold. The external stage fails open: a timeout or
//! error from the scorer is logged and the text is treated as not toxic, so an
//! outage of a third-party heuristic never blocks users.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tally_common::config::ModerationConfig;
use tally_common::Result;
use tracing::warn;

/// Built-in disallowed terms; extended by `[moderation] extra_banned_terms`
pub const DEFAULT_BANNED_TERMS: &[&str] = &[
    "kill yourself",
    "go die",
    "retard",
    "scumbag",
    "subhuman",
];

/// External toxicity scoring port
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Toxicity probability in `[0.0, 1.0]`
    async fn score(&self, text: &str) -> Result<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ModerationVerdict {
    Allowed,
    BannedTerm { term: String },
    Toxic { score: f64 },
}

impl ModerationVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ModerationVerdict::Allowed)
    }

    /// Human-readable reason for a rejection
    pub fn reason(&self) -> Option<String> {
        match self {
            ModerationVerdict::Allowed => None,
            ModerationVerdict::BannedTerm { .. } => Some("contains a disallowed term".to_string()),
            ModerationVerdict::Toxic { score } => Some(format!("toxicity score {:.2} above threshold", score)),
        }
    }
}

pub struct ContentModerationGuard {
    banned_terms: Vec<String>,
    scorer: Option<Arc<dyn ToxicityScorer>>,
    threshold: f64,
    timeout: Duration,
}

impl ContentModerationGuard {
    pub fn new(config: &ModerationConfig, scorer: Option<Arc<dyn ToxicityScorer>>) -> Self {
        let banned_terms = DEFAULT_BANNED_TERMS
            .iter()
            .map(|t| t.to_string())
            .chain(config.extra_banned_terms.iter().cloned())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            banned_terms,
            scorer,
            threshold: config.toxicity_threshold,
            timeout: config.toxicity_timeout(),
        }
    }

    pub async fn check(&self, text: &str) -> ModerationVerdict {
        let lowered = text.to_lowercase();
        if let Some(term) = self.banned_terms.iter().find(|t| lowered.contains(t.as_str())) {
            return ModerationVerdict::BannedTerm { term: term.clone() };
        }

        let Some(scorer) = &self.scorer else {
            return ModerationVerdict::Allowed;
        };

        match tokio::time::timeout(self.timeout, scorer.score(text)).await {
            Ok(Ok(score)) if score > self.threshold => ModerationVerdict::Toxic { score },
            Ok(Ok(_)) => ModerationVerdict::Allowed,
            Ok(Err(e)) => {
                warn!(error = %e, "Toxicity scoring failed, allowing content");
                ModerationVerdict::Allowed
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis(), "Toxicity scoring timed out, allowing content");
                ModerationVerdict::Allowed
            }
        }
    }

    pub async fn is_disallowed(&self, text: &str) -> bool {
        !self.check(text).await.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_common::Error;

    struct FixedScore(f64);

    #[async_trait]
    impl ToxicityScorer for FixedScore {
        async fn score(&self, _text: &str) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl ToxicityScorer for FailingScorer {
        async fn score(&self, _text: &str) -> Result<f64> {
            Err(Error::External("connection refused".to_string()))
        }
    }

    struct SlowScorer;

    #[async_trait]
    impl ToxicityScorer for SlowScorer {
        async fn score(&self, _text: &str) -> Result<f64> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1.0)
        }
    }

    fn guard_with(scorer: Option<Arc<dyn ToxicityScorer>>) -> ContentModerationGuard {
        let config = ModerationConfig {
            extra_banned_terms: vec!["Spamword".to_string()],
            toxicity_timeout_ms: 50,
            ..ModerationConfig::default()
        };
        ContentModerationGuard::new(&config, scorer)
    }

    #[tokio::test]
    async fn test_banned_term_matches_case_insensitively() {
        let guard = guard_with(None);
        let verdict = guard.check("buy now SPAMWORD deals").await;
        assert_eq!(
            verdict,
            ModerationVerdict::BannedTerm {
                term: "spamword".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_banned_term_skips_scorer() {
        // The scorer would allow it; the list decides first
        let guard = guard_with(Some(Arc::new(FixedScore(0.0))));
        assert!(guard.is_disallowed("just go die").await);
    }

    #[tokio::test]
    async fn test_score_above_threshold_is_toxic() {
        let guard = guard_with(Some(Arc::new(FixedScore(0.71))));
        assert_eq!(guard.check("hello").await, ModerationVerdict::Toxic { score: 0.71 });
    }

    #[tokio::test]
    async fn test_score_at_threshold_is_allowed() {
        let guard = guard_with(Some(Arc::new(FixedScore(0.7))));
        assert!(guard.check("hello").await.is_allowed());
    }

    #[tokio::test]
    async fn test_scorer_failure_fails_open() {
        let guard = guard_with(Some(Arc::new(FailingScorer)));
        assert!(guard.check("hello").await.is_allowed());
    }

    #[tokio::test]
    async fn test_scorer_timeout_fails_open() {
        let guard = guard_with(Some(Arc::new(SlowScorer)));
        assert!(guard.check("hello").await.is_allowed());
    }

    #[tokio::test]
    async fn test_no_scorer_allows_clean_text() {
        assert!(guard_with(None).check("see you at the town hall").await.is_allowed());
    }
}
