use std::time::Duration;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, Utc};
use reqwest::header::{IF_MODIFIED_SINCE, LAST_MODIFIED};
use reqwest::{Client, StatusCode};

use crate::error::FeedError;
use crate::http_date::{format_http_date, parse_http_date};
use crate::models::FetchResult;

const USER_AGENT: &str = concat!("feed-scraper/", env!("CARGO_PKG_VERSION"));

/// Largest feed body read into memory
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Retrieval of a feed's byte stream with cache validation.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch `url`, sending `If-Modified-Since` when `last_modified` is known.
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> crate::Result<FetchResult>;
}

/// Feed fetcher client
pub struct FeedClient {
    client: Client,
    max_body_bytes: usize,
}

impl FeedClient {
    /// Create a client whose requests are bounded by `timeout`
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self::with_client(client))
    }

    /// Create a new FeedClient with a custom reqwest Client
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    /// Override the body size limit
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Fetch a feed with conditional request support (Last-Modified)
    ///
    /// # Arguments
    /// * `url` - Feed URL, surrounding whitespace is ignored
    /// * `last_modified` - Cache watermark from the previous successful fetch
    ///
    /// # Returns
    /// `FetchResult::NotModified` on HTTP 304, otherwise the raw body and the
    /// parsed `Last-Modified` header of the response
    pub async fn fetch_conditional(
        &self,
        url: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> crate::Result<FetchResult> {
        let url = url.trim();
        tracing::debug!("Fetching feed from: {}", url);

        let mut request = self.client.get(url);
        if let Some(since) = &last_modified {
            request = request.header(IF_MODIFIED_SINCE, format_http_date(since));
        }

        let mut response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!("Feed not modified (HTTP 304): {}", url);
            return Ok(FetchResult::NotModified);
        }

        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        let too_large = || FeedError::TooLarge {
            url: url.to_string(),
            limit: self.max_body_bytes,
        };

        if response
            .content_length()
            .is_some_and(|len| len > self.max_body_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(FetchResult::Modified {
            body: body.freeze(),
            last_modified,
        })
    }
}

#[async_trait]
impl FeedFetcher for FeedClient {
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> crate::Result<FetchResult> {
        self.fetch_conditional(url, last_modified).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::Matcher;
    use std::io::Write;

    fn client() -> FeedClient {
        FeedClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_sends_if_modified_since_and_handles_304() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .match_header("if-modified-since", "Wed, 21 Oct 2015 07:28:00 GMT")
            .with_status(304)
            .create_async()
            .await;

        let since = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        let result = client()
            .fetch_conditional(&format!("{}/feed", server.url()), Some(since))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.is_not_modified());
    }

    #[tokio::test]
    async fn test_no_validator_without_watermark() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/feed")
            .match_header("if-modified-since", Matcher::Missing)
            .with_status(200)
            .with_body("<rss></rss>")
            .create_async()
            .await;

        let result = client()
            .fetch_conditional(&format!("{}/feed", server.url()), None)
            .await
            .unwrap();

        mock.assert_async().await;
        match result {
            FetchResult::Modified {
                body,
                last_modified,
            } => {
                assert_eq!(&body[..], b"<rss></rss>");
                assert_eq!(last_modified, None);
            }
            FetchResult::NotModified => panic!("expected a body"),
        }
    }

    #[tokio::test]
    async fn test_parses_last_modified_and_trims_url() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed")
            .with_status(200)
            .with_header("last-modified", "Tue, 3 Mar 2020 08:00:00 GMT")
            .with_body("<rss></rss>")
            .create_async()
            .await;

        let url = format!("  {}/feed \n", server.url());
        let result = client().fetch_conditional(&url, None).await.unwrap();

        match result {
            FetchResult::Modified { last_modified, .. } => assert_eq!(
                last_modified,
                Some(Utc.with_ymd_and_hms(2020, 3, 3, 8, 0, 0).unwrap())
            ),
            FetchResult::NotModified => panic!("expected a body"),
        }
    }

    #[tokio::test]
    async fn test_error_status_is_a_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed")
            .with_status(500)
            .create_async()
            .await;

        let result = client()
            .fetch_conditional(&format!("{}/feed", server.url()), None)
            .await;

        assert!(matches!(result, Err(FeedError::Status { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_rejects_declared_oversized_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body("x".repeat(64))
            .create_async()
            .await;

        let result = client()
            .with_max_body_bytes(16)
            .fetch_conditional(&format!("{}/feed", server.url()), None)
            .await;

        assert!(matches!(result, Err(FeedError::TooLarge { limit: 16, .. })));
    }

    #[tokio::test]
    async fn test_rejects_oversized_chunked_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed")
            .with_status(200)
            .with_chunked_body(|w| {
                for _ in 0..8 {
                    w.write_all(b"<item></item>")?;
                }
                Ok(())
            })
            .create_async()
            .await;

        let result = client()
            .with_max_body_bytes(32)
            .fetch_conditional(&format!("{}/feed", server.url()), None)
            .await;

        assert!(matches!(result, Err(FeedError::TooLarge { limit: 32, .. })));
    }

    #[tokio::test]
    async fn test_body_at_limit_is_read() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/feed")
            .with_status(200)
            .with_body("<rss></rss>")
            .create_async()
            .await;

        let result = client()
            .with_max_body_bytes(11)
            .fetch_conditional(&format!("{}/feed", server.url()), None)
            .await
            .unwrap();

        match result {
            FetchResult::Modified { body, .. } => assert_eq!(&body[..], b"<rss></rss>"),
            FetchResult::NotModified => panic!("expected a body"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_failure() {
        let result = client()
            .fetch_conditional("http://127.0.0.1:1/feed", None)
            .await;

        assert!(matches!(result, Err(FeedError::Request(_))));
    }
}
