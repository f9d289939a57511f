//! Ledger data types shared by the voting, guard and API layers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tally_common::Error;

use crate::voting::VoteChoice;

/// Kind of community content that can be voted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
}

impl TargetType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetType::Post => "post",
            TargetType::Comment => "comment",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(TargetType::Post),
            "comment" => Ok(TargetType::Comment),
            other => Err(Error::InvalidTarget(format!("unknown target type '{}'", other))),
        }
    }
}

/// Identifies one voter's vote on one target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoteKey {
    pub voter_id: String,
    pub target_type: TargetType,
    pub target_id: String,
}

impl VoteKey {
    pub fn new(voter_id: impl Into<String>, target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            voter_id: voter_id.into(),
            target_type,
            target_id: target_id.into(),
        }
    }
}

/// Up/down counters of one community target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAggregate {
    pub target_type: TargetType,
    pub target_id: String,
    pub upvotes: i64,
    pub downvotes: i64,
}

impl TargetAggregate {
    /// `upvotes - downvotes`
    pub fn score(&self) -> i64 {
        self.upvotes - self.downvotes
    }
}

/// Result of a community vote: the new counters and the voter's standing vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    #[serde(flatten)]
    pub aggregate: TargetAggregate,
    pub my_vote: Option<VoteChoice>,
}

/// One entry of the rolling submission log read by the abuse guard
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSample {
    pub author_id: String,
    pub kind: TargetType,
    pub normalized_text: String,
    /// Unix milliseconds
    pub created_at: i64,
}
