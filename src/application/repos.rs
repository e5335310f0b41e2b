//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{AutomationLogRecord, PostRecord, SubscriberRecord};
use crate::domain::types::PostStatus;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub status: PostStatus,
    pub scheduled_at: Option<OffsetDateTime>,
    pub published_at: Option<OffsetDateTime>,
    pub featured: bool,
    pub social_share_enabled: bool,
    pub email_notify_enabled: bool,
    pub zapier_webhook_url: Option<String>,
}

/// Partial patch applied to an existing post. An outer `None` leaves a
/// column unchanged; for the nullable columns the inner `Option` is the
/// stored value, so `Some(None)` clears back to NULL. There is no
/// optimistic concurrency, concurrent patches are last-writer-wins.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub image_url: Option<Option<String>>,
    pub status: Option<PostStatus>,
    pub scheduled_at: Option<Option<OffsetDateTime>>,
    pub published_at: Option<OffsetDateTime>,
    pub featured: Option<bool>,
    pub social_share_enabled: Option<bool>,
    pub email_notify_enabled: Option<bool>,
    pub zapier_webhook_url: Option<Option<String>>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// All posts, newest creation first.
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError>;

    /// Published posts only, newest publication first.
    async fn list_published(&self) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError>;

    /// Posts with `status = scheduled` whose `scheduled_at` has elapsed.
    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Apply a partial patch; `RepoError::NotFound` when the id is unknown.
    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<PostRecord, RepoError>;

    /// Hard delete. Returns `false` when the row was already absent.
    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError>;

    /// Conditional transition to `published`, guarded on the row still
    /// being `scheduled` so concurrent sweeps cannot double-publish.
    /// Returns `None` when the guard did not match.
    async fn mark_published_if_scheduled(
        &self,
        id: Uuid,
        published_at: OffsetDateTime,
    ) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait AutomationLogRepo: Send + Sync {
    /// Append-only; nothing in the service layer rewrites audit rows.
    async fn append_log(&self, record: AutomationLogRecord) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    /// Subscribers with `unsubscribed_at IS NULL` and `confirmed = true`.
    /// Preference gating happens in the dispatcher.
    async fn list_active(&self) -> Result<Vec<SubscriberRecord>, RepoError>;
}
