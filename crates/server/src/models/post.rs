use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted post (`posts` table)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    /// Derived dedup identifier, unique per source
    pub guid: String,
    pub source_id: i32,
}

/// Event forwarded on the post queue for every newly created post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreatedEvent {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub guid: String,
    pub blog_id: i32,
}

impl From<&Post> for PostCreatedEvent {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            url: post.url.clone(),
            published_at: post.published_at,
            guid: post.guid.clone(),
            blog_id: post.source_id,
        }
    }
}
