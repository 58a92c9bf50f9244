use std::error::Error;
use std::fmt;

/// Error type for broker channel operations.
#[derive(Debug)]
pub enum BrokerError {
    /// The broker refused or dropped the connection.
    ConnectionFailed(String),
    /// The channel has been closed.
    ChannelClosed,
    /// Publish target does not exist.
    UnknownExchange(String),
    /// Consume target does not exist.
    UnknownQueue(String),
    /// Another consumer already holds the queue.
    QueueInUse(String),
    /// Ack or reject for a delivery that is not outstanding.
    UnknownDeliveryTag(u64),
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::ConnectionFailed(msg) => write!(f, "connection failed: {}", msg),
            BrokerError::ChannelClosed => write!(f, "channel is closed"),
            BrokerError::UnknownExchange(name) => write!(f, "unknown exchange: {}", name),
            BrokerError::UnknownQueue(name) => write!(f, "unknown queue: {}", name),
            BrokerError::QueueInUse(name) => write!(f, "queue already has a consumer: {}", name),
            BrokerError::UnknownDeliveryTag(tag) => write!(f, "unknown delivery tag: {}", tag),
            BrokerError::Other(e) => write!(f, "broker error: {}", e),
        }
    }
}

impl Error for BrokerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BrokerError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}
