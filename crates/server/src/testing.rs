//! In-memory doubles for the repository, the broker and the fetcher.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use broker::{BrokerError, Delivery, DeliveryStream, Publisher, POST_QUEUE};
use chrono::{DateTime, TimeZone, Utc};
use feed::{FeedError, FeedFetcher, FetchResult};

use crate::models::{FeedSource, Post, PostCreatedEvent};
use crate::repositories::FeedRepository;

pub fn source(id: i32, feed_url: &str, last_fetched_at: Option<DateTime<Utc>>) -> FeedSource {
    FeedSource {
        id,
        hash_id: format!("hash-{}", id),
        feed_url: feed_url.to_string(),
        site_url: None,
        auto_title: None,
        auto_description: None,
        auto_image_url: None,
        auto_author: None,
        last_fetched_at,
        last_published_at: None,
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
        posts_last_month: None,
        last_modified_at: None,
    }
}

fn sql_failure(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected failure: {}", what))
}

#[derive(Default)]
struct RepositoryState {
    sources: Vec<FeedSource>,
    posts: Vec<Post>,
    cache_watermarks: Vec<(i32, DateTime<Utc>)>,
    fail_list: bool,
    fail_stats: bool,
    fail_exists_for: HashSet<String>,
    fail_create_for: HashSet<String>,
    write_count: usize,
}

/// Repository gateway kept in memory, with per-call failure injection
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<RepositoryState>,
}

impl InMemoryRepository {
    pub fn with_sources(sources: Vec<FeedSource>) -> Self {
        let repository = Self::default();
        repository.state.lock().unwrap().sources = sources;
        repository
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    pub fn fail_stats(&self) {
        self.state.lock().unwrap().fail_stats = true;
    }

    pub fn fail_exists_for(&self, identifier: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_exists_for
            .insert(identifier.to_string());
    }

    pub fn fail_create_for(&self, identifier: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_create_for
            .insert(identifier.to_string());
    }

    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().unwrap().posts.clone()
    }

    pub fn source(&self, id: i32) -> Option<FeedSource> {
        self.state
            .lock()
            .unwrap()
            .sources
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    pub fn cache_watermarks(&self) -> Vec<(i32, DateTime<Utc>)> {
        self.state.lock().unwrap().cache_watermarks.clone()
    }

    /// Number of successful write calls of any kind
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().write_count
    }
}

#[async_trait]
impl FeedRepository for InMemoryRepository {
    async fn list_feed_sources(&self) -> Result<Vec<FeedSource>, sqlx::Error> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(sql_failure("list"));
        }
        Ok(state.sources.clone())
    }

    async fn post_exists(&self, identifier: &str, source_id: i32) -> Result<bool, sqlx::Error> {
        let state = self.state.lock().unwrap();
        if state.fail_exists_for.contains(identifier) {
            return Err(sql_failure("exists"));
        }
        Ok(state
            .posts
            .iter()
            .any(|p| p.guid == identifier && p.source_id == source_id))
    }

    async fn create_post(&self, post: &Post) -> Result<i32, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_for.contains(&post.guid) {
            return Err(sql_failure("create"));
        }
        state.posts.push(post.clone());
        state.write_count += 1;
        Ok(state.posts.len() as i32)
    }

    async fn update_source_after_fetch(&self, source_id: i32) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stats {
            return Err(sql_failure("stats"));
        }

        let now = Utc::now();
        let month_ago = now - chrono::Duration::days(30);
        let posts: Vec<&Post> = state
            .posts
            .iter()
            .filter(|p| p.source_id == source_id)
            .collect();
        let last_published = posts.iter().map(|p| p.published_at).max();
        let last_month = posts.iter().filter(|p| p.published_at >= month_ago).count() as i32;

        if let Some(source) = state.sources.iter_mut().find(|s| s.id == source_id) {
            source.last_fetched_at = source.last_fetched_at.max(Some(now));
            source.posts_last_month = Some(last_month);
            source.last_published_at = last_published;
        }
        state.write_count += 1;
        Ok(())
    }

    async fn update_source_cache_watermark(
        &self,
        source_id: i32,
        last_modified_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        state.cache_watermarks.push((source_id, last_modified_at));
        if let Some(source) = state.sources.iter_mut().find(|s| s.id == source_id) {
            source.last_modified_at = Some(last_modified_at);
        }
        state.write_count += 1;
        Ok(())
    }
}

/// Publisher that records every message, optionally failing all publishes
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        let publisher = Self::default();
        publisher.failing.store(true, Ordering::SeqCst);
        publisher
    }

    pub fn messages(&self, queue: &str) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|(q, _)| q == queue)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<PostCreatedEvent> {
        self.messages(POST_QUEUE)
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, queue: &str, payload: &[u8]) -> broker::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BrokerError::ConnectionClosed);
        }
        self.messages
            .lock()
            .unwrap()
            .push((queue.to_string(), payload.to_vec()));
        Ok(())
    }
}

/// Fetcher answering from a queue of prepared responses
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<feed::Result<FetchResult>>>,
    calls: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<feed::Result<FetchResult>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn body(xml: String, last_modified: Option<DateTime<Utc>>) -> feed::Result<FetchResult> {
        Ok(FetchResult::Modified {
            body: xml.into_bytes().into(),
            last_modified,
        })
    }

    pub fn calls(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for ScriptedFetcher {
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<DateTime<Utc>>,
    ) -> feed::Result<FetchResult> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), last_modified));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FeedError::Parse("no scripted response".to_string())))
    }
}

/// Delivery that records its position when acked
pub struct ScriptedDelivery {
    index: usize,
    payload: Vec<u8>,
    fail_ack: bool,
    acked: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl Delivery for ScriptedDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self) -> broker::Result<()> {
        if self.fail_ack {
            return Err(BrokerError::ConnectionClosed);
        }
        self.acked.lock().unwrap().push(self.index);
        Ok(())
    }
}

/// Fixed sequence of deliveries; ends the stream or stays open once drained
pub struct ScriptedDeliveries {
    deliveries: VecDeque<ScriptedDelivery>,
    hold_open: bool,
    acked: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedDeliveries {
    pub fn new(payloads: Vec<Vec<u8>>) -> Self {
        let acked = Arc::new(Mutex::new(Vec::new()));
        let deliveries = payloads
            .into_iter()
            .enumerate()
            .map(|(index, payload)| ScriptedDelivery {
                index,
                payload,
                fail_ack: false,
                acked: acked.clone(),
            })
            .collect();
        Self {
            deliveries,
            hold_open: false,
            acked,
        }
    }

    /// A stream that never yields
    pub fn pending() -> Self {
        Self {
            hold_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn fail_ack(&mut self, index: usize) {
        if let Some(delivery) = self.deliveries.iter_mut().find(|d| d.index == index) {
            delivery.fail_ack = true;
        }
    }

    pub fn acked(&self) -> Vec<usize> {
        self.acked.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.deliveries.len()
    }
}

#[async_trait]
impl DeliveryStream for ScriptedDeliveries {
    type Item = ScriptedDelivery;

    async fn next_delivery(&mut self) -> Option<broker::Result<ScriptedDelivery>> {
        match self.deliveries.pop_front() {
            Some(delivery) => Some(Ok(delivery)),
            None if self.hold_open => std::future::pending().await,
            None => None,
        }
    }
}

/// A minimal RSS 2.0 document.
///
/// Each item is `(title, link, pub_date)`; `None` omits the element.
pub fn rss(items: &[(&str, Option<&str>, Option<DateTime<Utc>>)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test Blog</title><link>https://x</link><description>test</description>"#,
    );
    for (title, link, published) in items {
        xml.push_str("<item>");
        xml.push_str(&format!("<title>{}</title>", title));
        if let Some(link) = link {
            xml.push_str(&format!("<link>{}</link>", link));
        }
        if let Some(published) = published {
            xml.push_str(&format!("<pubDate>{}</pubDate>", published.to_rfc2822()));
        }
        xml.push_str(&format!("<description>{} body</description>", title));
        xml.push_str("</item>");
    }
    xml.push_str("</channel></rss>");
    xml
}
