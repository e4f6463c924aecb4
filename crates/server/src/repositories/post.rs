use sqlx::PgPool;

use crate::models::Post;

pub struct PostRepository;

impl PostRepository {
    /// Check whether a post with this identifier was already ingested for the source
    pub async fn exists(pool: &PgPool, guid: &str, source_id: i32) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE guid = $1 AND blog_id = $2)",
        )
        .bind(guid)
        .bind(source_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Insert a new post, returning its id
    pub async fn create(pool: &PgPool, post: &Post) -> Result<i32, sqlx::Error> {
        let id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (blog_id, title, content, url, published_at, guid, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id
            "#,
        )
        .bind(post.source_id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(&post.url)
        .bind(post.published_at)
        .bind(&post.guid)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }
}
