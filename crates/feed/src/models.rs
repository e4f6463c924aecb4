use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single entry parsed from an upstream RSS/Atom feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    /// Full content, falling back to the summary/description
    pub content: String,
    pub link: Option<String>,
    /// Published date, falling back to the updated date
    pub published_at: Option<DateTime<Utc>>,
    /// The feed's own identifier for this entry, if it supplied one
    pub guid: Option<String>,
}

/// Result of parsing a feed byte stream.
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

/// Result of a conditional fetch.
#[derive(Debug, Clone)]
pub enum FetchResult {
    /// Feed has been modified (or no cache validator was sent)
    Modified {
        body: Bytes,
        /// Parsed `Last-Modified` header, if present and well-formed
        last_modified: Option<DateTime<Utc>>,
    },
    /// Feed has not been modified since the given time (HTTP 304)
    NotModified,
}

impl FetchResult {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, FetchResult::NotModified)
    }
}
