use feed::FeedItem;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Item '{title}' has no guid, no link and no publish time")]
    MissingTimestamp { title: String },
}

/// Stable dedup key for a feed item.
///
/// Upstream guid first, then link, then a SHA-256 over the title followed
/// by the publish time in epoch milliseconds.
pub fn derive_identifier(item: &FeedItem) -> Result<String, IdentifierError> {
    if let Some(guid) = non_empty(item.guid.as_deref()) {
        return Ok(guid.to_string());
    }

    if let Some(link) = non_empty(item.link.as_deref()) {
        return Ok(link.to_string());
    }

    let published_at = item
        .published_at
        .ok_or_else(|| IdentifierError::MissingTimestamp {
            title: item.title.clone(),
        })?;

    Ok(content_hash(&item.title, published_at.timestamp_millis()))
}

fn content_hash(title: &str, published_millis: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(published_millis.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
