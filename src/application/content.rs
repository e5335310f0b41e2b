//! Public blog content resolution.
//!
//! The public feed merges a small seed list compiled into the binary
//! with published rows from the store, de-duplicating by slug. Store
//! rows win so an editor can supersede a seed post by reusing its slug.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::repos::{PostsRepo, RepoError};
use crate::domain::entities::PostRecord;
use crate::domain::types::PostStatus;

const SEED_POSTS_TOML: &str = include_str!("seed_posts.toml");

/// One post as presented on the public surface, whichever source it
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicPost {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    pub featured: bool,
}

impl From<PostRecord> for PublicPost {
    fn from(post: PostRecord) -> Self {
        Self {
            slug: post.slug,
            title: post.title,
            excerpt: post.excerpt,
            content: post.content,
            author: post.author,
            category: post.category,
            tags: post.tags,
            image_url: post.image_url,
            published_at: post.published_at,
            featured: post.featured,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SeedPost {
    slug: String,
    title: String,
    excerpt: String,
    content: String,
    author: String,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    featured: bool,
}

impl From<SeedPost> for PublicPost {
    fn from(seed: SeedPost) -> Self {
        Self {
            slug: seed.slug,
            title: seed.title,
            excerpt: seed.excerpt,
            content: seed.content,
            author: seed.author,
            category: seed.category,
            tags: seed.tags,
            image_url: seed.image_url,
            published_at: None,
            featured: seed.featured,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    posts: Vec<SeedPost>,
}

pub struct ContentResolver {
    reader: Arc<dyn PostsRepo>,
    seeds: Vec<PublicPost>,
}

impl ContentResolver {
    pub fn new(reader: Arc<dyn PostsRepo>) -> Self {
        Self {
            reader,
            seeds: bundled_seed_posts(),
        }
    }

    /// Published store rows first (newest publication leading), then any
    /// seed posts whose slug the store has not claimed.
    pub async fn list(&self) -> Result<Vec<PublicPost>, RepoError> {
        let fetched = self.reader.list_published().await?;
        Ok(merge_posts(fetched, &self.seeds))
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<PublicPost>, RepoError> {
        if let Some(post) = self.reader.find_by_slug(slug).await? {
            // Status is the source of truth: a retracted post keeps its
            // original published_at but is no longer public. Draft and
            // scheduled rows also shadow any seed with the same slug.
            if post.status == PostStatus::Published && post.published_at.is_some() {
                return Ok(Some(post.into()));
            }
            return Ok(None);
        }

        Ok(self.seeds.iter().find(|seed| seed.slug == slug).cloned())
    }
}

fn merge_posts(fetched: Vec<PostRecord>, seeds: &[PublicPost]) -> Vec<PublicPost> {
    let mut seen: HashSet<String> = fetched.iter().map(|post| post.slug.clone()).collect();
    let mut merged: Vec<PublicPost> = fetched.into_iter().map(PublicPost::from).collect();

    for seed in seeds {
        if seen.insert(seed.slug.clone()) {
            merged.push(seed.clone());
        }
    }

    merged
}

fn bundled_seed_posts() -> Vec<PublicPost> {
    let file: SeedFile = toml::from_str(SEED_POSTS_TOML).unwrap_or(SeedFile { posts: Vec::new() });
    file.posts.into_iter().map(PublicPost::from).collect()
}
