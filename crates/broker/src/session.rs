use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Consumer};
use tokio::sync::mpsc;

use crate::config::BrokerConfig;
use crate::publisher::ChannelPublisher;
use crate::{BrokerError, Delivery, DeliveryStream, FEED_QUEUE, POST_QUEUE};

/// AMQP reply code for a normal shutdown
const REPLY_SUCCESS: u16 = 200;

/// An open connection with one channel and both queues declared
pub struct Session {
    connection: Connection,
    channel: Channel,
    closed: mpsc::UnboundedReceiver<lapin::Error>,
}

impl Session {
    /// Dial the broker, open a channel and declare both queues as durable.
    ///
    /// With `prefetch` set, the channel never holds more than that many
    /// unacknowledged deliveries.
    pub async fn open(config: &BrokerConfig, prefetch: Option<u16>) -> crate::Result<Self> {
        let connection =
            Connection::connect(&config.uri(), ConnectionProperties::default()).await?;

        let (notify, closed) = mpsc::unbounded_channel();
        connection.on_error(move |err| {
            let _ = notify.send(err);
        });

        match Self::prepare_channel(&connection, prefetch).await {
            Ok(channel) => Ok(Self {
                connection,
                channel,
                closed,
            }),
            Err(e) => {
                let _ = connection.close(REPLY_SUCCESS, "setup failed").await;
                Err(e)
            }
        }
    }

    async fn prepare_channel(
        connection: &Connection,
        prefetch: Option<u16>,
    ) -> crate::Result<Channel> {
        let channel = connection.create_channel().await?;

        for queue in [FEED_QUEUE, POST_QUEUE] {
            channel
                .queue_declare(
                    queue,
                    QueueDeclareOptions {
                        durable: true,
                        ..QueueDeclareOptions::default()
                    },
                    FieldTable::default(),
                )
                .await?;
        }

        if let Some(count) = prefetch {
            channel
                .basic_qos(count, BasicQosOptions::default())
                .await?;
        }

        Ok(channel)
    }

    /// Start consuming `queue` with manual acknowledgment
    pub async fn consume(&self, queue: &str, consumer_tag: &str) -> crate::Result<JobStream> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(JobStream { consumer })
    }

    pub fn publisher(&self) -> ChannelPublisher {
        ChannelPublisher::new(self.channel.clone())
    }

    /// Resolves once the broker reports the connection as lost
    pub async fn closed(&mut self) -> BrokerError {
        match self.closed.recv().await {
            Some(err) => BrokerError::Amqp(err),
            None => BrokerError::ConnectionClosed,
        }
    }

    /// Close channel and connection, ignoring errors from an already dead link
    pub async fn close(self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "bye").await {
            tracing::debug!("Channel close failed: {}", e);
        }
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "bye").await {
            tracing::debug!("Connection close failed: {}", e);
        }
    }
}

/// Stream of fetch jobs from a consumer
pub struct JobStream {
    consumer: Consumer,
}

#[async_trait]
impl DeliveryStream for JobStream {
    type Item = JobDelivery;

    async fn next_delivery(&mut self) -> Option<crate::Result<JobDelivery>> {
        let delivery = self.consumer.next().await?;

        Some(
            delivery
                .map(|d| JobDelivery {
                    payload: d.data,
                    acker: d.acker,
                })
                .map_err(BrokerError::from),
        )
    }
}

/// A single delivery awaiting acknowledgment
pub struct JobDelivery {
    payload: Vec<u8>,
    acker: Acker,
}

#[async_trait]
impl Delivery for JobDelivery {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self) -> crate::Result<()> {
        self.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }
}
