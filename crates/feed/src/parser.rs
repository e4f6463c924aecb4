use feed_rs::model::{Entry, Feed};
use feed_rs::parser;

use crate::models::{FeedItem, ParsedFeed};
use crate::FeedError;

/// Parse an RSS/Atom/JSON feed from raw bytes.
///
/// Entries without an upstream identifier get `guid: None` rather than an
/// identifier synthesized by the parser, so callers can apply their own
/// fallback rules.
pub fn parse_feed(body: &[u8]) -> Result<ParsedFeed, FeedError> {
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(body)
        .map_err(|e| FeedError::Parse(e.to_string()))?;

    Ok(ParsedFeed::from(feed))
}

impl From<Feed> for ParsedFeed {
    fn from(feed: Feed) -> Self {
        Self {
            title: feed.title.map(|t| t.content),
            items: feed.entries.into_iter().map(FeedItem::from).collect(),
        }
    }
}

impl From<Entry> for FeedItem {
    fn from(entry: Entry) -> Self {
        let content = entry
            .content
            .and_then(|c| c.body)
            .filter(|body| !body.is_empty())
            .or_else(|| entry.summary.map(|s| s.content))
            .unwrap_or_default();

        Self {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            content,
            link: entry
                .links
                .into_iter()
                .map(|link| link.href)
                .find(|href| !href.trim().is_empty()),
            published_at: entry.published.or(entry.updated),
            guid: Some(entry.id).filter(|id| !id.trim().is_empty()),
        }
    }
}
