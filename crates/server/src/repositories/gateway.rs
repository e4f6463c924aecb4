use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{FeedSourceRepository, PostRepository};
use crate::models::{FeedSource, Post};

/// Storage seen by the pipeline: feed sources and their posts.
#[async_trait]
pub trait FeedRepository: Send + Sync {
    /// Sources referenced by at least one list
    async fn list_feed_sources(&self) -> Result<Vec<FeedSource>, sqlx::Error>;

    async fn post_exists(&self, identifier: &str, source_id: i32) -> Result<bool, sqlx::Error>;

    /// Persist a post, returning its id
    async fn create_post(&self, post: &Post) -> Result<i32, sqlx::Error>;

    /// Bump `last_fetched_at`, then recompute `posts_last_month` and
    /// `last_published_at`. Stops at the first failing step.
    async fn update_source_after_fetch(&self, source_id: i32) -> Result<(), sqlx::Error>;

    async fn update_source_cache_watermark(
        &self,
        source_id: i32,
        last_modified_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error>;
}

/// PostgreSQL-backed [`FeedRepository`]
#[derive(Clone)]
pub struct PgFeedRepository {
    pool: PgPool,
}

impl PgFeedRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedRepository for PgFeedRepository {
    async fn list_feed_sources(&self) -> Result<Vec<FeedSource>, sqlx::Error> {
        FeedSourceRepository::get_listed(&self.pool).await
    }

    async fn post_exists(&self, identifier: &str, source_id: i32) -> Result<bool, sqlx::Error> {
        PostRepository::exists(&self.pool, identifier, source_id).await
    }

    async fn create_post(&self, post: &Post) -> Result<i32, sqlx::Error> {
        PostRepository::create(&self.pool, post).await
    }

    async fn update_source_after_fetch(&self, source_id: i32) -> Result<(), sqlx::Error> {
        FeedSourceRepository::touch_last_fetched(&self.pool, source_id).await?;
        FeedSourceRepository::refresh_posts_last_month(&self.pool, source_id).await?;
        FeedSourceRepository::refresh_last_published(&self.pool, source_id).await?;
        Ok(())
    }

    async fn update_source_cache_watermark(
        &self,
        source_id: i32,
        last_modified_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        FeedSourceRepository::update_last_modified(&self.pool, source_id, last_modified_at).await
    }
}
