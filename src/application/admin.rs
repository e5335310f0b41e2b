//! Admin CRUD gateway: a single password-gated envelope covering
//! verify/list/create/update/delete on post records.
//!
//! The shared secret is compared in constant time and checked once up
//! front for every action, before any field-level validation runs, so
//! a bad secret always reports `Unauthorized` rather than leaking which
//! fields were malformed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostPatch, PostsRepo, PostsWriteRepo, RepoError,
};
use crate::domain::entities::PostRecord;
use crate::domain::posts::{
    FieldError, MAX_AUTHOR_LEN, MAX_CATEGORY_LEN, MAX_EXCERPT_LEN, MAX_SLUG_LEN, MAX_TITLE_LEN,
    ensure_bounded, ensure_non_empty, ensure_well_formed_url,
};
use crate::domain::slug::derive_slug;
use crate::domain::types::PostStatus;

const MAX_SLUG_SUFFIX_ATTEMPTS: usize = 32;

/// Inbound request envelope, discriminated on `action`. One schema per
/// action keeps fields from leaking across actions.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminRequest {
    Verify {
        password: String,
    },
    List {
        password: String,
    },
    Create {
        password: String,
        post: PostDraft,
    },
    Update {
        password: String,
        post_id: Uuid,
        post: PostPatchBody,
    },
    Delete {
        password: String,
        post_id: Uuid,
    },
}

impl AdminRequest {
    fn password(&self) -> &str {
        match self {
            AdminRequest::Verify { password }
            | AdminRequest::List { password }
            | AdminRequest::Create { password, .. }
            | AdminRequest::Update { password, .. }
            | AdminRequest::Delete { password, .. } => password,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub status: PostStatus,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub scheduled_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub social_share_enabled: bool,
    #[serde(default)]
    pub email_notify_enabled: bool,
    #[serde(default)]
    pub zapier_webhook_url: Option<String>,
}

/// Nullable columns use a two-level `Option`: an absent field leaves
/// the column alone, an explicit JSON `null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatchBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default, deserialize_with = "double_option_rfc3339")]
    pub scheduled_at: Option<Option<OffsetDateTime>>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub social_share_enabled: Option<bool>,
    #[serde(default)]
    pub email_notify_enabled: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub zapier_webhook_url: Option<Option<String>>,
}

/// Uniform response envelope shared by success and error paths.
#[derive(Debug, Default, Serialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Vec<PostRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AdminResponse {
    fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid admin password")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] FieldError),
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Store(RepoError),
}

impl From<RepoError> for GatewayError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => GatewayError::NotFound,
            other => GatewayError::Store(other),
        }
    }
}

pub struct AdminGatewayService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    password: String,
}

impl AdminGatewayService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        password: String,
    ) -> Self {
        Self {
            reader,
            writer,
            password,
        }
    }

    pub async fn handle(&self, request: AdminRequest) -> Result<AdminResponse, GatewayError> {
        self.verify_secret(request.password())?;

        match request {
            AdminRequest::Verify { .. } => Ok(AdminResponse::with_message("password accepted")),
            AdminRequest::List { .. } => self.list().await,
            AdminRequest::Create { post, .. } => self.create(post).await,
            AdminRequest::Update { post_id, post, .. } => self.update(post_id, post).await,
            AdminRequest::Delete { post_id, .. } => self.delete(post_id).await,
        }
    }

    fn verify_secret(&self, supplied: &str) -> Result<(), GatewayError> {
        if self
            .password
            .as_bytes()
            .ct_eq(supplied.as_bytes())
            .unwrap_u8()
            == 0
        {
            return Err(GatewayError::Unauthorized);
        }
        Ok(())
    }

    async fn list(&self) -> Result<AdminResponse, GatewayError> {
        let posts = self.reader.list_posts().await?;
        Ok(AdminResponse {
            posts: Some(posts),
            ..AdminResponse::ok()
        })
    }

    async fn create(&self, draft: PostDraft) -> Result<AdminResponse, GatewayError> {
        validate_draft(&draft)?;

        let slug = match draft.slug.as_deref().map(str::trim) {
            Some(explicit) if !explicit.is_empty() => {
                ensure_bounded(explicit, MAX_SLUG_LEN, "slug")?;
                if self.reader.find_by_slug(explicit).await?.is_some() {
                    return Err(FieldError::new("slug", "already in use").into());
                }
                explicit.to_string()
            }
            _ => self.unique_slug_for(&draft.title).await?,
        };

        let now = OffsetDateTime::now_utc();
        // Publishing at creation time stamps published_at immediately.
        let published_at = (draft.status == PostStatus::Published).then_some(now);

        let params = CreatePostParams {
            slug,
            title: draft.title,
            excerpt: draft.excerpt,
            content: draft.content,
            author: draft.author,
            category: draft.category,
            tags: draft.tags,
            image_url: none_if_blank(draft.image_url),
            status: draft.status,
            scheduled_at: draft.scheduled_at,
            published_at,
            featured: draft.featured,
            social_share_enabled: draft.social_share_enabled,
            email_notify_enabled: draft.email_notify_enabled,
            zapier_webhook_url: none_if_blank(draft.zapier_webhook_url),
        };

        let post = self.writer.create_post(params).await?;

        info!(
            target = "application::admin",
            slug = post.slug,
            status = post.status.as_str(),
            "post created"
        );

        Ok(AdminResponse {
            post_id: Some(post.id),
            ..AdminResponse::ok()
        })
    }

    async fn update(
        &self,
        post_id: Uuid,
        body: PostPatchBody,
    ) -> Result<AdminResponse, GatewayError> {
        validate_patch(&body)?;

        let Some(existing) = self.reader.find_by_id(post_id).await? else {
            return Err(GatewayError::NotFound);
        };

        // An explicit transition to published stamps published_at unless
        // the post already carries one from a previous publication.
        let published_at = match body.status {
            Some(PostStatus::Published) if existing.published_at.is_none() => {
                Some(OffsetDateTime::now_utc())
            }
            _ => None,
        };

        let patch = PostPatch {
            slug: body.slug,
            title: body.title,
            excerpt: body.excerpt,
            content: body.content,
            author: body.author,
            category: body.category,
            tags: body.tags,
            image_url: body.image_url.map(none_if_blank),
            status: body.status,
            scheduled_at: body.scheduled_at,
            published_at,
            featured: body.featured,
            social_share_enabled: body.social_share_enabled,
            email_notify_enabled: body.email_notify_enabled,
            zapier_webhook_url: body.zapier_webhook_url.map(none_if_blank),
        };

        let post = self.writer.update_post(post_id, patch).await?;

        info!(
            target = "application::admin",
            slug = post.slug,
            status = post.status.as_str(),
            "post updated"
        );

        Ok(AdminResponse {
            post_id: Some(post.id),
            ..AdminResponse::ok()
        })
    }

    /// Delete is best-effort idempotent: removing an absent id succeeds.
    async fn delete(&self, post_id: Uuid) -> Result<AdminResponse, GatewayError> {
        let removed = self.writer.delete_post(post_id).await?;

        if removed {
            info!(target = "application::admin", %post_id, "post deleted");
        }

        Ok(AdminResponse::with_message(if removed {
            "post deleted"
        } else {
            "post already absent"
        }))
    }

    async fn unique_slug_for(&self, title: &str) -> Result<String, GatewayError> {
        let base =
            derive_slug(title).map_err(|_| FieldError::new("title", "cannot derive a slug"))?;

        if self.reader.find_by_slug(&base).await?.is_none() {
            return Ok(base);
        }

        for attempt in 2..=MAX_SLUG_SUFFIX_ATTEMPTS {
            let candidate = format!("{base}-{attempt}");
            if self.reader.find_by_slug(&candidate).await?.is_none() {
                return Ok(candidate);
            }
        }

        Err(FieldError::new("slug", "could not find a free slug").into())
    }
}

fn validate_draft(draft: &PostDraft) -> Result<(), FieldError> {
    ensure_non_empty(&draft.title, "title")?;
    ensure_bounded(&draft.title, MAX_TITLE_LEN, "title")?;
    ensure_non_empty(&draft.content, "content")?;
    ensure_bounded(&draft.excerpt, MAX_EXCERPT_LEN, "excerpt")?;
    ensure_bounded(&draft.author, MAX_AUTHOR_LEN, "author")?;
    ensure_bounded(&draft.category, MAX_CATEGORY_LEN, "category")?;
    ensure_well_formed_url(draft.image_url.as_deref(), "image_url")?;
    ensure_well_formed_url(draft.zapier_webhook_url.as_deref(), "zapier_webhook_url")?;
    Ok(())
}

fn validate_patch(body: &PostPatchBody) -> Result<(), FieldError> {
    if let Some(title) = body.title.as_deref() {
        ensure_non_empty(title, "title")?;
        ensure_bounded(title, MAX_TITLE_LEN, "title")?;
    }
    if let Some(content) = body.content.as_deref() {
        ensure_non_empty(content, "content")?;
    }
    if let Some(excerpt) = body.excerpt.as_deref() {
        ensure_bounded(excerpt, MAX_EXCERPT_LEN, "excerpt")?;
    }
    if let Some(author) = body.author.as_deref() {
        ensure_bounded(author, MAX_AUTHOR_LEN, "author")?;
    }
    if let Some(category) = body.category.as_deref() {
        ensure_bounded(category, MAX_CATEGORY_LEN, "category")?;
    }
    if let Some(slug) = body.slug.as_deref() {
        ensure_non_empty(slug, "slug")?;
        ensure_bounded(slug, MAX_SLUG_LEN, "slug")?;
    }
    ensure_well_formed_url(
        body.image_url.as_ref().and_then(|value| value.as_deref()),
        "image_url",
    )?;
    ensure_well_formed_url(
        body.zapier_webhook_url
            .as_ref()
            .and_then(|value| value.as_deref()),
        "zapier_webhook_url",
    )?;
    Ok(())
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value.filter(|raw| !raw.trim().is_empty())
}

/// Wrap the deserialized value in `Some` so serde's field default
/// (`None`) is reached only when the field is absent, while an explicit
/// JSON `null` becomes `Some(None)`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn double_option_rfc3339<'de, D>(
    deserializer: D,
) -> Result<Option<Option<OffsetDateTime>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    time::serde::rfc3339::option::deserialize(deserializer).map(Some)
}
