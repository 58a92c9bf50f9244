//! Broker capabilities the messaging core depends on.

use std::sync::Arc;

use super::error::BrokerError;
use super::properties::{Delivery, TransportProperties};
use crate::config::ConnectionTarget;

/// Callback invoked for every delivery on a consumed queue.
///
/// Runs on whatever thread the channel delivers on; a slow callback holds
/// up further deliveries on that channel.
pub type DeliveryCallback = Arc<dyn Fn(Delivery) + Send + Sync>;

/// A channel on an open broker connection.
///
/// Implementations might include:
/// - `InMemoryBroker` channels - for testing and single-process use
/// - an AMQP client channel - for RabbitMQ and compatible brokers
pub trait BrokerChannel: Send + Sync {
    /// Publish a body with its properties to an exchange.
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &TransportProperties,
        body: Option<&[u8]>,
    ) -> Result<(), BrokerError>;

    /// Start consuming a queue. Returns the consumer tag.
    fn consume(&self, queue: &str, on_delivery: DeliveryCallback) -> Result<String, BrokerError>;

    /// Acknowledge a delivery.
    fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    /// Reject a delivery, optionally asking the broker to redeliver it.
    fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError>;

    fn is_open(&self) -> bool;

    fn close(&self) -> Result<(), BrokerError>;
}

/// An open connection that hands out channels.
pub trait BrokerConnection: Send + Sync {
    fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError>;
}

/// Opens connections to a broker.
pub trait Connector: Send + Sync {
    fn connect(&self, target: &ConnectionTarget) -> Result<Arc<dyn BrokerConnection>, BrokerError>;
}
