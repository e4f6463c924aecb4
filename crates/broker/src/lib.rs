//! AMQP plumbing for the feed pipeline.
//!
//! Two durable queues are used: [`FEED_QUEUE`] carries one fetch job per
//! feed source due for refresh, [`POST_QUEUE`] carries one event per newly
//! ingested post.

use async_trait::async_trait;

mod config;
mod error;
mod publisher;
mod session;

pub use config::BrokerConfig;
pub use error::BrokerError;
pub use publisher::ChannelPublisher;
pub use session::{JobDelivery, JobStream, Session};

pub type Result<T> = std::result::Result<T, BrokerError>;

/// Queue of fetch jobs, one per stale feed source
pub const FEED_QUEUE: &str = "feed_queue";
/// Queue of post-created events for live-update subscribers
pub const POST_QUEUE: &str = "post_queue";

/// Publishing side of the broker
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a persistent message to `queue` through the default exchange
    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<()>;
}

/// A received message that is acknowledged once handled
#[async_trait]
pub trait Delivery: Send + Sized {
    fn payload(&self) -> &[u8];

    /// Acknowledge the message; consumes it so it can only happen once
    async fn ack(self) -> Result<()>;
}

/// Ordered source of deliveries
#[async_trait]
pub trait DeliveryStream: Send {
    type Item: Delivery;

    /// Next delivery, or `None` once the consumer is cancelled
    async fn next_delivery(&mut self) -> Option<Result<Self::Item>>;
}
