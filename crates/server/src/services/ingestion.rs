use std::sync::Arc;

use broker::{Publisher, POST_QUEUE};
use chrono::{DateTime, Utc};
use feed::{parse_feed, FeedFetcher, FeedItem, FetchResult, ParsedFeed};

use crate::error::{AppError, AppResult};
use crate::models::{FeedSource, Post, PostCreatedEvent};
use crate::repositories::FeedRepository;
use crate::services::{derive_identifier, Metrics};

/// How a fetch job ended. Every outcome is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Payload could not be decoded
    Dropped,
    /// Remote answered 304
    NotModified,
    /// Transport error, non-2xx status or unparsable body
    FetchFailed,
    /// Any other failure that escaped the job
    Failed,
    Ingested(IngestReport),
}

/// Per-job item counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Items newer than the snapshot's `last_fetched_at`
    pub candidates: usize,
    pub created: usize,
    /// Already ingested
    pub skipped: usize,
    pub failed: usize,
    /// Created posts whose event reached the post queue
    pub forwarded: usize,
}

enum ItemOutcome {
    Created { forwarded: bool },
    Exists,
}

/// Runs the per-job ingestion state machine
pub struct IngestionService {
    repository: Arc<dyn FeedRepository>,
    fetcher: Arc<dyn FeedFetcher>,
    metrics: Arc<Metrics>,
}

impl IngestionService {
    pub fn new(
        repository: Arc<dyn FeedRepository>,
        fetcher: Arc<dyn FeedFetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repository,
            fetcher,
            metrics,
        }
    }

    /// Process one fetch job payload.
    ///
    /// Never fails: errors are logged and counted here, and the caller acks
    /// the delivery whatever the outcome.
    pub async fn handle_job(&self, payload: &[u8], events: &dyn Publisher) -> JobOutcome {
        let source: FeedSource = match serde_json::from_slice(payload) {
            Ok(source) => source,
            Err(e) => {
                tracing::error!("Dropping undecodable fetch job: {}", e);
                self.metrics.record_failure();
                return JobOutcome::Dropped;
            }
        };

        match self.ingest(&source, events).await {
            Ok(outcome) => outcome,
            Err(AppError::Feed(e)) => {
                tracing::error!(
                    "[source_id={}] Failed to fetch {}: {}",
                    source.id,
                    source.feed_url.trim(),
                    e
                );
                self.metrics.record_failure();
                JobOutcome::FetchFailed
            }
            Err(e) => {
                tracing::error!("[source_id={}] Job failed: {}", source.id, e);
                self.metrics.record_failure();
                JobOutcome::Failed
            }
        }
    }

    async fn ingest(&self, source: &FeedSource, events: &dyn Publisher) -> AppResult<JobOutcome> {
        let now = Utc::now();

        let Some(parsed) = self.fetch(source).await? else {
            tracing::debug!(
                "[source_id={}] Feed not modified: {}",
                source.id,
                source.feed_url.trim()
            );
            self.metrics.record_feed_processed(0);
            return Ok(JobOutcome::NotModified);
        };

        let candidates = select_candidates(parsed.items, source.last_fetched_at, now);
        let mut report = IngestReport {
            candidates: candidates.len(),
            ..IngestReport::default()
        };

        for item in &candidates {
            match self.persist_item(source, item, now, events).await {
                Ok(ItemOutcome::Created { forwarded }) => {
                    report.created += 1;
                    if forwarded {
                        report.forwarded += 1;
                    }
                }
                Ok(ItemOutcome::Exists) => {
                    tracing::debug!(
                        "[source_id={}] Post already exists: {}",
                        source.id,
                        item.title
                    );
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "[source_id={}] Failed to ingest '{}': {}",
                        source.id,
                        item.title,
                        e
                    );
                    self.metrics.record_error();
                    report.failed += 1;
                }
            }
        }

        if let Err(e) = self.repository.update_source_after_fetch(source.id).await {
            tracing::error!(
                "[source_id={}] Failed to update source stats: {}",
                source.id,
                e
            );
            self.metrics.record_error();
        }

        self.metrics.record_feed_processed(report.candidates as u64);

        tracing::info!(
            "[source_id={}] Processed feed {}: {} new posts found, {} posts saved",
            source.id,
            parsed.title.as_deref().unwrap_or(source.feed_url.trim()),
            report.candidates,
            report.created
        );

        Ok(JobOutcome::Ingested(report))
    }

    /// Conditional fetch and parse; `None` when the remote reports no change
    async fn fetch(&self, source: &FeedSource) -> AppResult<Option<ParsedFeed>> {
        let result = self
            .fetcher
            .fetch(&source.feed_url, source.last_modified_at)
            .await?;

        let (body, last_modified) = match result {
            FetchResult::NotModified => return Ok(None),
            FetchResult::Modified {
                body,
                last_modified,
            } => (body, last_modified),
        };

        if let Some(last_modified) = last_modified {
            if let Err(e) = self
                .repository
                .update_source_cache_watermark(source.id, last_modified)
                .await
            {
                tracing::warn!(
                    "[source_id={}] Failed to store Last-Modified: {}",
                    source.id,
                    e
                );
                self.metrics.record_error();
            }
        }

        Ok(Some(parse_feed(&body)?))
    }

    async fn persist_item(
        &self,
        source: &FeedSource,
        item: &FeedItem,
        now: DateTime<Utc>,
        events: &dyn Publisher,
    ) -> AppResult<ItemOutcome> {
        let identifier = derive_identifier(item)?;

        if self.repository.post_exists(&identifier, source.id).await? {
            return Ok(ItemOutcome::Exists);
        }

        let post = Post {
            title: item.title.clone(),
            content: item.content.clone(),
            url: item.link.clone().unwrap_or_default(),
            published_at: item.published_at.unwrap_or(now),
            guid: identifier,
            source_id: source.id,
        };

        let id = self.repository.create_post(&post).await?;
        tracing::debug!("[source_id={}] Created post {}: {}", source.id, id, post.title);

        let forwarded = match forward(&post, events).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    "[source_id={}] Failed to forward post {}: {}",
                    source.id,
                    id,
                    e
                );
                self.metrics.record_error();
                false
            }
        };

        Ok(ItemOutcome::Created { forwarded })
    }
}

async fn forward(post: &Post, events: &dyn Publisher) -> AppResult<()> {
    let payload = serde_json::to_vec(&PostCreatedEvent::from(post))?;
    events.publish(POST_QUEUE, &payload).await?;
    Ok(())
}

/// Items published strictly after `last_fetched_at`, or every item for a
/// never-fetched source. Undated items count as published at `now`.
pub fn select_candidates(
    items: Vec<FeedItem>,
    last_fetched_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<FeedItem> {
    match last_fetched_at {
        None => items,
        Some(watermark) => items
            .into_iter()
            .filter(|item| item.published_at.unwrap_or(now) > watermark)
            .collect(),
    }
}
