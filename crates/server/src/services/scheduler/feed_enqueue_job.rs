use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use broker::{BrokerConfig, BrokerError, Publisher, Session, FEED_QUEUE};
use chrono::{DateTime, Utc};

use super::traits::{JobResult, SchedulerJob};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::FeedSource;
use crate::repositories::FeedRepository;
use crate::services::Metrics;

/// Enqueues a fetch job for every feed source past the staleness threshold.
///
/// Each run lists all sources, opens its own broker session, publishes the
/// stale ones to the feed queue and closes the session again.
pub struct FeedEnqueueJob {
    repository: Arc<dyn FeedRepository>,
    broker: BrokerConfig,
    metrics: Arc<Metrics>,
    interval: Duration,
    threshold: chrono::Duration,
    publish_timeout: Duration,
}

impl FeedEnqueueJob {
    pub fn new(
        repository: Arc<dyn FeedRepository>,
        metrics: Arc<Metrics>,
        config: &Config,
    ) -> Self {
        Self {
            repository,
            broker: config.broker.clone(),
            metrics,
            interval: config.poll_interval,
            threshold: config.staleness_threshold,
            publish_timeout: config.publish_timeout,
        }
    }

    /// Publish a fetch job for every stale source, returning how many were sent.
    ///
    /// The first failing publish aborts the batch.
    pub async fn enqueue_stale(
        &self,
        sources: &[FeedSource],
        publisher: &dyn Publisher,
        now: DateTime<Utc>,
    ) -> AppResult<usize> {
        let mut sent = 0;

        for source in sources {
            if !source.is_stale(now, self.threshold) {
                tracing::debug!(
                    "[source_id={}] Skipping {}",
                    source.id,
                    source.feed_url.trim()
                );
                continue;
            }

            let payload = serde_json::to_vec(source)?;
            tokio::time::timeout(self.publish_timeout, publisher.publish(FEED_QUEUE, &payload))
                .await
                .map_err(|_| BrokerError::Timeout)??;

            tracing::info!("[source_id={}] Sent {}", source.id, source.feed_url.trim());
            sent += 1;
        }

        Ok(sent)
    }

    async fn run_once(&self) -> AppResult<usize> {
        let sources = match self.repository.list_feed_sources().await {
            Ok(sources) => {
                self.metrics.set_db_connected(true);
                sources
            }
            Err(e) => {
                self.metrics.set_db_connected(false);
                return Err(e.into());
            }
        };
        tracing::info!("Fetched {} feed sources", sources.len());

        let session = Session::open(&self.broker, None).await?;
        let result = self
            .enqueue_stale(&sources, &session.publisher(), Utc::now())
            .await;
        session.close().await;

        result
    }
}

#[async_trait]
impl SchedulerJob for FeedEnqueueJob {
    fn name(&self) -> &'static str {
        "FeedEnqueue"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn execute(&self) -> JobResult {
        match self.run_once().await {
            Ok(sent) => {
                tracing::info!("Enqueued {} stale feed sources", sent);
                self.metrics.mark_run_succeeded();
                Ok(())
            }
            Err(e) => {
                self.metrics.record_failure();
                Err(e)
            }
        }
    }
}
