//! Process-wide health counters and gauges.
//!
//! One [`Metrics`] instance is created per process and handed to every
//! component by `Arc`. Counters only ever increase; gauges are last writer
//! wins.

use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

/// Which process the metrics belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    /// Enqueues fetch jobs for stale sources
    Scheduler,
    /// Consumes fetch jobs and ingests posts
    Worker,
}

impl Component {
    /// OpenMetrics name prefix
    pub fn metric_prefix(&self) -> &'static str {
        match self {
            Self::Scheduler => "feed_sender",
            Self::Worker => "feed_worker",
        }
    }

    /// Whether health also depends on a live broker connection
    pub fn requires_broker(&self) -> bool {
        matches!(self, Self::Worker)
    }

    fn display_name(&self) -> &'static str {
        match self {
            Self::Scheduler => "feed sender",
            Self::Worker => "feed worker",
        }
    }
}

pub struct Metrics {
    component: Component,
    processed_feeds: AtomicU64,
    processed_posts: AtomicU64,
    errors: AtomicU64,
    /// Unix millis, 0 = never
    last_successful_run: AtomicI64,
    /// Unix millis, 0 = never
    last_connection: AtomicI64,
    healthy: AtomicBool,
    broker_connected: AtomicBool,
    db_connected: AtomicBool,
}

impl Metrics {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            processed_feeds: AtomicU64::new(0),
            processed_posts: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            last_successful_run: AtomicI64::new(0),
            last_connection: AtomicI64::new(0),
            healthy: AtomicBool::new(false),
            broker_connected: AtomicBool::new(false),
            db_connected: AtomicBool::new(false),
        }
    }

    pub fn component(&self) -> Component {
        self.component
    }

    /// A feed job completed; `posts` is the number of candidate items it saw
    pub fn record_feed_processed(&self, posts: u64) {
        self.processed_feeds.fetch_add(1, Ordering::Relaxed);
        self.processed_posts.fetch_add(posts, Ordering::Relaxed);
        self.mark_run_succeeded();
    }

    /// An isolated failure that leaves the process healthy
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A failure that ends the current job or tick
    pub fn record_failure(&self) {
        self.record_error();
        self.set_healthy(false);
    }

    pub fn mark_run_succeeded(&self) {
        self.last_successful_run
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        self.set_healthy(true);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn set_broker_connected(&self, connected: bool) {
        self.broker_connected.store(connected, Ordering::Relaxed);
        if connected {
            self.last_connection
                .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        }
    }

    pub fn set_db_connected(&self, connected: bool) {
        self.db_connected.store(connected, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        let healthy = self.healthy.load(Ordering::Relaxed);
        if self.component.requires_broker() {
            healthy && self.broker_connected.load(Ordering::Relaxed)
        } else {
            healthy
        }
    }

    pub fn error_count(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn processed_feeds(&self) -> u64 {
        self.processed_feeds.load(Ordering::Relaxed)
    }

    pub fn processed_posts(&self) -> u64 {
        self.processed_posts.load(Ordering::Relaxed)
    }

    /// Consistent-enough view for the health endpoint
    pub fn snapshot(&self) -> HealthStatus {
        let healthy = self.is_healthy();
        HealthStatus {
            status: if healthy {
                HealthState::Healthy
            } else {
                HealthState::Unhealthy
            },
            last_successful_run: millis_to_time(self.last_successful_run.load(Ordering::Relaxed)),
            processed_feeds_count: self.processed_feeds(),
            processed_posts_count: self.processed_posts(),
            error_count: self.error_count(),
            rabbit_mq_connected: self.broker_connected.load(Ordering::Relaxed),
            db_connected: self.db_connected.load(Ordering::Relaxed),
            last_connection_time: millis_to_time(self.last_connection.load(Ordering::Relaxed)),
        }
    }

    /// Render all gauges and counters in OpenMetrics text format
    pub fn render_openmetrics(&self) -> String {
        let prefix = self.component.metric_prefix();
        let snapshot = self.snapshot();
        let last_run = snapshot
            .last_successful_run
            .map(|t| t.timestamp())
            .unwrap_or(0);

        let mut out = String::new();
        write_metric(
            &mut out,
            prefix,
            "healthy",
            "gauge",
            &format!("Whether the {} is healthy", self.component.display_name()),
            bool_value(snapshot.status == HealthState::Healthy),
        );
        write_metric(
            &mut out,
            prefix,
            "last_successful_run_timestamp_seconds",
            "gauge",
            "Unix timestamp of last successful run",
            last_run,
        );
        write_metric(
            &mut out,
            prefix,
            "processed_feeds_total",
            "counter",
            "Total number of feeds processed",
            snapshot.processed_feeds_count,
        );
        write_metric(
            &mut out,
            prefix,
            "processed_posts_total",
            "counter",
            "Total number of posts processed",
            snapshot.processed_posts_count,
        );
        write_metric(
            &mut out,
            prefix,
            "errors_total",
            "counter",
            "Total number of errors encountered",
            snapshot.error_count,
        );
        write_metric(
            &mut out,
            prefix,
            "rabbitmq_connected",
            "gauge",
            "Whether RabbitMQ is connected",
            bool_value(snapshot.rabbit_mq_connected),
        );
        write_metric(
            &mut out,
            prefix,
            "db_connected",
            "gauge",
            "Whether the database is connected",
            bool_value(snapshot.db_connected),
        );
        out.push_str("# EOF\n");
        out
    }
}

fn write_metric(
    out: &mut String,
    prefix: &str,
    name: &str,
    kind: &str,
    help: &str,
    value: impl std::fmt::Display,
) {
    let _ = writeln!(out, "# HELP {}_{} {}", prefix, name, help);
    let _ = writeln!(out, "# TYPE {}_{} {}", prefix, name, kind);
    let _ = writeln!(out, "{}_{} {}", prefix, name, value);
}

fn bool_value(flag: bool) -> u8 {
    u8::from(flag)
}

fn millis_to_time(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        None
    } else {
        DateTime::from_timestamp_millis(millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Unhealthy,
}

/// Health endpoint response body
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: HealthState,
    pub last_successful_run: Option<DateTime<Utc>>,
    pub processed_feeds_count: u64,
    pub processed_posts_count: u64,
    pub error_count: u64,
    #[serde(rename = "rabbitMQConnected")]
    pub rabbit_mq_connected: bool,
    pub db_connected: bool,
    pub last_connection_time: Option<DateTime<Utc>>,
}
