use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Broker operation timed out")]
    Timeout,

    #[error("Broker connection closed")]
    ConnectionClosed,
}
