use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostPatch, PostsRepo, PostsWriteRepo, RepoError,
};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

const POST_COLUMNS: &str = "id, slug, title, excerpt, content, author, category, tags, \
     image_url, status, scheduled_at, published_at, featured, social_share_enabled, \
     email_notify_enabled, zapier_webhook_url, created_at, updated_at";

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_published(&self) -> Result<Vec<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE status = 'published'::post_status AND published_at IS NOT NULL \
             ORDER BY published_at DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts \
             WHERE status = 'scheduled'::post_status AND scheduled_at <= $1"
        ))
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        sqlx::query_as::<_, PostRecord>(&format!(
            "INSERT INTO posts (id, slug, title, excerpt, content, author, category, tags, \
                 image_url, status, scheduled_at, published_at, featured, \
                 social_share_enabled, email_notify_enabled, zapier_webhook_url, \
                 created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 now(), now()) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&params.slug)
        .bind(&params.title)
        .bind(&params.excerpt)
        .bind(&params.content)
        .bind(&params.author)
        .bind(&params.category)
        .bind(&params.tags)
        .bind(&params.image_url)
        .bind(params.status)
        .bind(params.scheduled_at)
        .bind(params.published_at)
        .bind(params.featured)
        .bind(params.social_share_enabled)
        .bind(params.email_notify_enabled)
        .bind(&params.zapier_webhook_url)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<PostRecord, RepoError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE posts SET updated_at = now()");

        if let Some(slug) = patch.slug {
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(title) = patch.title {
            qb.push(", title = ").push_bind(title);
        }
        if let Some(excerpt) = patch.excerpt {
            qb.push(", excerpt = ").push_bind(excerpt);
        }
        if let Some(content) = patch.content {
            qb.push(", content = ").push_bind(content);
        }
        if let Some(author) = patch.author {
            qb.push(", author = ").push_bind(author);
        }
        if let Some(category) = patch.category {
            qb.push(", category = ").push_bind(category);
        }
        if let Some(tags) = patch.tags {
            qb.push(", tags = ").push_bind(tags);
        }
        if let Some(image_url) = patch.image_url {
            qb.push(", image_url = ").push_bind(image_url);
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            qb.push(", scheduled_at = ").push_bind(scheduled_at);
        }
        if let Some(published_at) = patch.published_at {
            qb.push(", published_at = ").push_bind(published_at);
        }
        if let Some(featured) = patch.featured {
            qb.push(", featured = ").push_bind(featured);
        }
        if let Some(social) = patch.social_share_enabled {
            qb.push(", social_share_enabled = ").push_bind(social);
        }
        if let Some(email) = patch.email_notify_enabled {
            qb.push(", email_notify_enabled = ").push_bind(email);
        }
        if let Some(webhook) = patch.zapier_webhook_url {
            qb.push(", zapier_webhook_url = ").push_bind(webhook);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(format!(" RETURNING {POST_COLUMNS}"));

        qb.build_query_as::<PostRecord>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?
            .ok_or(RepoError::NotFound)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_published_if_scheduled(
        &self,
        id: Uuid,
        published_at: OffsetDateTime,
    ) -> Result<Option<PostRecord>, RepoError> {
        // The status guard is the optimistic-concurrency protection for
        // concurrent sweep triggers: only one UPDATE can match.
        sqlx::query_as::<_, PostRecord>(&format!(
            "UPDATE posts \
                SET status = 'published'::post_status, \
                    published_at = $2, \
                    scheduled_at = NULL, \
                    updated_at = now() \
              WHERE id = $1 AND status = 'scheduled'::post_status \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(published_at)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}
