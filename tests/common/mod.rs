//! In-memory repository implementation shared by the integration suites.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use stillpoint::application::repos::{
    AutomationLogRepo, CreatePostParams, PostPatch, PostsRepo, PostsWriteRepo, RepoError,
    SubscribersRepo,
};
use stillpoint::domain::entities::{AutomationLogRecord, PostRecord, SubscriberRecord};
use stillpoint::domain::types::PostStatus;

#[derive(Default)]
pub struct MemoryRepositories {
    pub posts: Mutex<Vec<PostRecord>>,
    pub logs: Mutex<Vec<AutomationLogRecord>>,
    pub subscribers: Mutex<Vec<SubscriberRecord>>,
    /// Post ids whose writes fail, for partial-failure scenarios.
    pub failing_posts: Mutex<HashSet<Uuid>>,
}

impl MemoryRepositories {
    pub fn insert_post(&self, post: PostRecord) -> Uuid {
        let id = post.id;
        self.posts.lock().unwrap().push(post);
        id
    }

    pub fn fail_writes_for(&self, id: Uuid) {
        self.failing_posts.lock().unwrap().insert(id);
    }

    pub fn insert_subscriber(&self, subscriber: SubscriberRecord) {
        self.subscribers.lock().unwrap().push(subscriber);
    }

    pub fn logs_of_type(&self, automation_type: &str) -> Vec<AutomationLogRecord> {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.automation_type == automation_type)
            .cloned()
            .collect()
    }

    pub fn post(&self, id: Uuid) -> Option<PostRecord> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.id == id)
            .cloned()
    }
}

#[async_trait]
impl PostsRepo for MemoryRepositories {
    async fn list_posts(&self) -> Result<Vec<PostRecord>, RepoError> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn list_published(&self) -> Result<Vec<PostRecord>, RepoError> {
        let mut posts: Vec<PostRecord> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| post.status == PostStatus::Published && post.published_at.is_some())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        Ok(self.post(id))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .find(|post| post.slug == slug)
            .cloned())
    }

    async fn list_due_scheduled(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<PostRecord>, RepoError> {
        Ok(self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|post| {
                post.status == PostStatus::Scheduled
                    && post.scheduled_at.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let post = PostRecord {
            id: Uuid::new_v4(),
            slug: params.slug,
            title: params.title,
            excerpt: params.excerpt,
            content: params.content,
            author: params.author,
            category: params.category,
            tags: params.tags,
            image_url: params.image_url,
            status: params.status,
            scheduled_at: params.scheduled_at,
            published_at: params.published_at,
            featured: params.featured,
            social_share_enabled: params.social_share_enabled,
            email_notify_enabled: params.email_notify_enabled,
            zapier_webhook_url: params.zapier_webhook_url,
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(&self, id: Uuid, patch: PostPatch) -> Result<PostRecord, RepoError> {
        if self.failing_posts.lock().unwrap().contains(&id) {
            return Err(RepoError::from_persistence("injected failure"));
        }

        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|post| post.id == id)
            .ok_or(RepoError::NotFound)?;

        if let Some(slug) = patch.slug {
            post.slug = slug;
        }
        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(excerpt) = patch.excerpt {
            post.excerpt = excerpt;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        if let Some(author) = patch.author {
            post.author = author;
        }
        if let Some(category) = patch.category {
            post.category = category;
        }
        if let Some(tags) = patch.tags {
            post.tags = tags;
        }
        if let Some(image_url) = patch.image_url {
            post.image_url = image_url;
        }
        if let Some(status) = patch.status {
            post.status = status;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            post.scheduled_at = scheduled_at;
        }
        if let Some(published_at) = patch.published_at {
            post.published_at = Some(published_at);
        }
        if let Some(featured) = patch.featured {
            post.featured = featured;
        }
        if let Some(social) = patch.social_share_enabled {
            post.social_share_enabled = social;
        }
        if let Some(email) = patch.email_notify_enabled {
            post.email_notify_enabled = email;
        }
        if let Some(webhook) = patch.zapier_webhook_url {
            post.zapier_webhook_url = webhook;
        }
        post.updated_at = OffsetDateTime::now_utc();

        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|post| post.id != id);
        Ok(posts.len() < before)
    }

    async fn mark_published_if_scheduled(
        &self,
        id: Uuid,
        published_at: OffsetDateTime,
    ) -> Result<Option<PostRecord>, RepoError> {
        if self.failing_posts.lock().unwrap().contains(&id) {
            return Err(RepoError::from_persistence("injected failure"));
        }

        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.iter_mut().find(|post| post.id == id) else {
            return Ok(None);
        };
        if post.status != PostStatus::Scheduled {
            return Ok(None);
        }

        post.status = PostStatus::Published;
        post.published_at = Some(published_at);
        post.scheduled_at = None;
        post.updated_at = OffsetDateTime::now_utc();
        Ok(Some(post.clone()))
    }
}

#[async_trait]
impl AutomationLogRepo for MemoryRepositories {
    async fn append_log(&self, record: AutomationLogRecord) -> Result<(), RepoError> {
        self.logs.lock().unwrap().push(record);
        Ok(())
    }
}

#[async_trait]
impl SubscribersRepo for MemoryRepositories {
    async fn list_active(&self) -> Result<Vec<SubscriberRecord>, RepoError> {
        Ok(self
            .subscribers
            .lock()
            .unwrap()
            .iter()
            .filter(|subscriber| subscriber.unsubscribed_at.is_none() && subscriber.confirmed)
            .cloned()
            .collect())
    }
}

pub fn scheduled_post(slug: &str, scheduled_at: OffsetDateTime) -> PostRecord {
    let now = OffsetDateTime::now_utc();
    PostRecord {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: format!("Post {slug}"),
        excerpt: "An excerpt.".into(),
        content: "Body text.".into(),
        author: "Mara".into(),
        category: "meditation".into(),
        tags: vec!["calm".into()],
        image_url: None,
        status: PostStatus::Scheduled,
        scheduled_at: Some(scheduled_at),
        published_at: None,
        featured: false,
        social_share_enabled: false,
        email_notify_enabled: false,
        zapier_webhook_url: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn subscriber(email: &str, confirmed: bool, new_posts_pref: Option<bool>) -> SubscriberRecord {
    SubscriberRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        confirmed,
        preferences: match new_posts_pref {
            Some(flag) => json!({ "new_posts": flag }),
            None => json!({}),
        },
        unsubscribed_at: None,
        created_at: OffsetDateTime::now_utc(),
    }
}
