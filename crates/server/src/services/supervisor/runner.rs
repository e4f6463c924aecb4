use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use broker::{
    BrokerConfig, BrokerError, Delivery, DeliveryStream, JobStream, Publisher, Session,
    FEED_QUEUE,
};
use tokio::sync::watch;

use super::handle::SupervisorHandle;
use super::state::{SupervisorEvent, SupervisorState};
use crate::services::{IngestionService, Metrics};

/// Unacknowledged jobs one worker may hold
const PREFETCH: u16 = 1;
const CONSUMER_TAG: &str = "feed-worker";

/// Sole owner of the worker's broker connection.
///
/// Connects, consumes the feed queue one job at a time and reconnects with a
/// fixed delay whenever the connection drops. Never returns.
pub struct ConnectionSupervisor {
    broker: BrokerConfig,
    ingestion: Arc<IngestionService>,
    metrics: Arc<Metrics>,
    reconnect_delay: Duration,
    state: watch::Sender<SupervisorState>,
}

impl ConnectionSupervisor {
    pub fn new(
        broker: BrokerConfig,
        ingestion: Arc<IngestionService>,
        metrics: Arc<Metrics>,
        reconnect_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SupervisorState::Disconnected);
        Self {
            broker,
            ingestion,
            metrics,
            reconnect_delay,
            state,
        }
    }

    /// Read-only view of the connection state
    pub fn subscribe(&self) -> SupervisorHandle {
        SupervisorHandle::new(self.state.subscribe())
    }

    /// 运行连接主循环
    pub async fn run(self) {
        tracing::info!("Connection supervisor started");

        loop {
            self.transition(SupervisorEvent::Dial);

            let (mut session, mut jobs) = match self.connect().await {
                Ok(connected) => connected,
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to RabbitMQ: {}, retrying in {:?}",
                        e,
                        self.reconnect_delay
                    );
                    self.transition(SupervisorEvent::SetupFailed);
                    self.metrics.set_broker_connected(false);
                    self.metrics.set_healthy(false);
                    tokio::time::sleep(self.reconnect_delay).await;
                    continue;
                }
            };

            self.transition(SupervisorEvent::Established);
            self.metrics.set_broker_connected(true);
            self.metrics.set_healthy(true);
            tracing::info!("RabbitMQ connection open");

            let publisher = session.publisher();
            let reason = self
                .consume(&mut jobs, session.closed(), &publisher)
                .await;

            tracing::error!("RabbitMQ connection closed: {}", reason);
            self.transition(SupervisorEvent::ConnectionLost);
            self.metrics.set_broker_connected(false);
            self.metrics.set_healthy(false);
            session.close().await;
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn connect(&self) -> broker::Result<(Session, JobStream)> {
        let session = Session::open(&self.broker, Some(PREFETCH)).await?;
        match session.consume(FEED_QUEUE, CONSUMER_TAG).await {
            Ok(jobs) => Ok((session, jobs)),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// Handle deliveries in order, acking each one after its job finishes,
    /// until `closed` resolves or the stream ends
    async fn consume<S, C>(&self, jobs: &mut S, closed: C, events: &dyn Publisher) -> BrokerError
    where
        S: DeliveryStream,
        C: Future<Output = BrokerError>,
    {
        tokio::pin!(closed);

        loop {
            tokio::select! {
                reason = &mut closed => return reason,
                delivery = jobs.next_delivery() => {
                    let delivery = match delivery {
                        Some(Ok(delivery)) => delivery,
                        Some(Err(e)) => return e,
                        None => return BrokerError::ConnectionClosed,
                    };

                    let outcome = self.ingestion.handle_job(delivery.payload(), events).await;
                    tracing::debug!("Job finished: {:?}", outcome);

                    if let Err(e) = delivery.ack().await {
                        return e;
                    }
                }
            }
        }
    }

    fn transition(&self, event: SupervisorEvent) {
        self.state.send_modify(|state| *state = state.next(event));
    }
}
