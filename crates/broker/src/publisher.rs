use async_trait::async_trait;
use lapin::options::BasicPublishOptions;
use lapin::{BasicProperties, Channel};

use crate::Publisher;

/// Delivery mode 2 asks the broker to persist the message
const PERSISTENT: u8 = 2;

/// Publisher bound to one open channel
#[derive(Clone)]
pub struct ChannelPublisher {
    channel: Channel,
}

impl ChannelPublisher {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, queue: &str, payload: &[u8]) -> crate::Result<()> {
        let properties = BasicProperties::default()
            .with_delivery_mode(PERSISTENT)
            .with_content_type("text/plain".into());

        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await?
            .await?;

        Ok(())
    }
}
