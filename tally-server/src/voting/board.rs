//! Guarded content submission
//!
//! Posts and comments become vote targets here. Every submission is screened
//! by the abuse guard before anything is written; comments, being
//! conversational, also go through content moderation. An accepted submission
//! creates the target with zeroed counters and appends to the submission log
//! in the same transaction.

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tally_common::config::AbusePolicy;
use tally_common::db::{begin_monitored, retry_on_lock};
use tally_common::time::now_millis;
use tally_common::{Error, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::submissions::record_sample;
use crate::db::targets::{self, NewTarget};
use crate::guard::{normalize_submission, AbuseGuard, ContentModerationGuard};
use crate::models::{SubmissionSample, TargetType};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub post_id: String,
    pub content: String,
}

/// Accepted submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedContent {
    pub target_type: TargetType,
    pub target_id: String,
    /// Set when the abuse guard flagged it under a non-blocking policy
    pub flagged: bool,
}

pub struct CommunityBoard {
    db: SqlitePool,
    abuse: Arc<AbuseGuard>,
    moderation: Arc<ContentModerationGuard>,
    max_lock_wait_ms: u64,
}

impl CommunityBoard {
    pub fn new(
        db: SqlitePool,
        abuse: Arc<AbuseGuard>,
        moderation: Arc<ContentModerationGuard>,
        max_lock_wait_ms: u64,
    ) -> Self {
        Self {
            db,
            abuse,
            moderation,
            max_lock_wait_ms,
        }
    }

    pub async fn create_post(&self, author_id: &str, post: NewPost) -> Result<SubmittedContent> {
        let title = post.title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("title must not be blank".to_string()));
        }
        require_content(&post.content)?;

        let flagged = self
            .screen(author_id, TargetType::Post, Some(title), &post.content)
            .await?;

        let target_id = Uuid::new_v4().to_string();
        self.persist(NewTarget {
            target_type: TargetType::Post,
            target_id: &target_id,
            author_id,
            parent_id: None,
            title: Some(title),
            body: &post.content,
            created_at: now_millis(),
        })
        .await?;

        info!(author_id, target_id = %target_id, flagged, "Post created");
        Ok(SubmittedContent {
            target_type: TargetType::Post,
            target_id,
            flagged,
        })
    }

    pub async fn create_comment(&self, author_id: &str, comment: NewComment) -> Result<SubmittedContent> {
        require_content(&comment.content)?;

        if !targets::target_exists(&self.db, TargetType::Post, &comment.post_id).await? {
            return Err(Error::InvalidTarget(format!("post '{}' does not exist", comment.post_id)));
        }

        let verdict = self.moderation.check(&comment.content).await;
        if let Some(reason) = verdict.reason() {
            info!(author_id, post_id = %comment.post_id, ?verdict, "Comment rejected by moderation");
            return Err(Error::ContentRejected(reason));
        }

        let flagged = self
            .screen(author_id, TargetType::Comment, None, &comment.content)
            .await?;

        let target_id = Uuid::new_v4().to_string();
        self.persist(NewTarget {
            target_type: TargetType::Comment,
            target_id: &target_id,
            author_id,
            parent_id: Some(&comment.post_id),
            title: None,
            body: &comment.content,
            created_at: now_millis(),
        })
        .await?;

        info!(author_id, target_id = %target_id, post_id = %comment.post_id, flagged, "Comment created");
        Ok(SubmittedContent {
            target_type: TargetType::Comment,
            target_id,
            flagged,
        })
    }

    /// Run the abuse guard and apply the configured policy; returns the flag
    async fn screen(&self, author_id: &str, kind: TargetType, title: Option<&str>, content: &str) -> Result<bool> {
        let assessment = self.abuse.assess(author_id, kind, title, content).await;
        let Some(reason) = assessment.reason else {
            return Ok(false);
        };

        match self.abuse.config().policy {
            AbusePolicy::Block => {
                warn!(author_id, kind = %kind, ?reason, "Submission blocked by abuse guard");
                Err(Error::SuspectedAbuse(format!("{:?} check fired", reason).to_lowercase()))
            }
            AbusePolicy::Warn => {
                warn!(author_id, kind = %kind, ?reason, "Suspicious submission accepted (warn policy)");
                Ok(true)
            }
            AbusePolicy::Log => {
                info!(author_id, kind = %kind, ?reason, "Suspicious submission accepted (log policy)");
                Ok(false)
            }
        }
    }

    async fn persist(&self, target: NewTarget<'_>) -> Result<()> {
        let sample = SubmissionSample {
            author_id: target.author_id.to_string(),
            kind: target.target_type,
            normalized_text: normalize_submission(target.title, target.body),
            created_at: target.created_at,
        };
        let target = &target;
        let sample = &sample;

        retry_on_lock("board::persist", self.max_lock_wait_ms, move || async move {
            let mut tx = begin_monitored(&self.db, "board::persist").await?;
            targets::insert_target(tx.conn(), target).await?;
            record_sample(tx.conn(), sample).await?;
            tx.commit().await
        })
        .await
    }
}

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::InvalidInput("content must not be blank".to_string()));
    }
    Ok(())
}
