use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::FeedSource;

/// Common SELECT fields for feed source queries
const SELECT_FEED_SOURCE: &str = r#"
    SELECT
        id, hash_id, feed_url, site_url,
        auto_title, auto_description, auto_image_url, auto_author,
        last_fetched_at, last_published_at, created_at,
        posts_last_month, last_modified_at
    FROM blogs
"#;

pub struct FeedSourceRepository;

impl FeedSourceRepository {
    /// Get all sources that belong to at least one list
    pub async fn get_listed(pool: &PgPool) -> Result<Vec<FeedSource>, sqlx::Error> {
        let query = format!(
            "{} WHERE id IN (SELECT DISTINCT blog_id FROM list_blogs) ORDER BY id",
            SELECT_FEED_SOURCE
        );
        let rows = sqlx::query_as::<_, FeedSourceRow>(&query)
            .fetch_all(pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Set `last_fetched_at` to now, never moving it backwards
    pub async fn touch_last_fetched(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE blogs
            SET last_fetched_at = GREATEST(last_fetched_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Recompute the number of posts published within the trailing month
    pub async fn refresh_posts_last_month(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE blogs
            SET posts_last_month = (
                SELECT COUNT(*)
                FROM posts
                WHERE blog_id = $1
                AND published_at >= (CURRENT_TIMESTAMP - INTERVAL '1 month')
            )
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Recompute `last_published_at` as the latest post of the source
    pub async fn refresh_last_published(pool: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE blogs
            SET last_published_at = (
                SELECT MAX(published_at)
                FROM posts
                WHERE blog_id = $1
            )
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Store the `Last-Modified` value of the latest fetch
    pub async fn update_last_modified(
        pool: &PgPool,
        id: i32,
        last_modified_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE blogs SET last_modified_at = $1 WHERE id = $2")
            .bind(last_modified_at)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }
}

/// Internal row type for mapping database results
#[derive(Debug, sqlx::FromRow)]
struct FeedSourceRow {
    id: i32,
    hash_id: String,
    feed_url: String,
    site_url: Option<String>,
    auto_title: Option<String>,
    auto_description: Option<String>,
    auto_image_url: Option<String>,
    auto_author: Option<String>,
    last_fetched_at: Option<DateTime<Utc>>,
    last_published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    posts_last_month: Option<i32>,
    last_modified_at: Option<DateTime<Utc>>,
}

impl From<FeedSourceRow> for FeedSource {
    fn from(row: FeedSourceRow) -> Self {
        Self {
            id: row.id,
            hash_id: row.hash_id,
            feed_url: row.feed_url,
            site_url: row.site_url,
            auto_title: row.auto_title,
            auto_description: row.auto_description,
            auto_image_url: row.auto_image_url,
            auto_author: row.auto_author,
            last_fetched_at: row.last_fetched_at,
            last_published_at: row.last_published_at,
            created_at: row.created_at,
            posts_last_month: row.posts_last_month,
            last_modified_at: row.last_modified_at,
        }
    }
}
