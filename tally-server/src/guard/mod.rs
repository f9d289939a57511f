//! Pre-persistence submission guards
//!
//! Both guards are heuristics evaluated before anything is written. They report
//! a verdict; the submission path decides whether to block, flag or log.

pub mod abuse;
pub mod moderation;
pub mod toxicity;

pub use abuse::{normalize_submission, AbuseAssessment, AbuseGuard, AbuseReason, SubmissionSource};
pub use moderation::{ContentModerationGuard, ModerationVerdict, ToxicityScorer, DEFAULT_BANNED_TERMS};
pub use toxicity::PerspectiveClient;
