use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A subscribed RSS/Atom endpoint (`blogs` table).
///
/// Also the payload of a fetch job: the scheduler serializes the row as it
/// was listed, and the worker makes every decision against that snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedSource {
    pub id: i32,
    pub hash_id: String,
    pub feed_url: String,
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub auto_title: Option<String>,
    #[serde(default)]
    pub auto_description: Option<String>,
    #[serde(default)]
    pub auto_image_url: Option<String>,
    #[serde(default)]
    pub auto_author: Option<String>,
    /// Time of the last completed fetch; `None` means never fetched
    #[serde(default)]
    pub last_fetched_at: Option<DateTime<Utc>>,
    /// Latest `published_at` across the source's posts
    #[serde(default)]
    pub last_published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub posts_last_month: Option<i32>,
    /// Last `Last-Modified` header seen for the feed URL
    #[serde(default)]
    pub last_modified_at: Option<DateTime<Utc>>,
}

impl FeedSource {
    /// Whether the source is due for refresh at `now`.
    ///
    /// Never-fetched sources are always due; otherwise the boundary is
    /// inclusive.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        match self.last_fetched_at {
            None => true,
            Some(fetched) => now - fetched >= threshold,
        }
    }
}
