//! In-memory broker for testing and single-process scenarios.
//!
//! `InMemoryBroker` implements the full set of broker capabilities
//! (`Connector`, `BrokerConnection`, `BrokerChannel`) without any network,
//! useful for:
//! - Unit and integration testing without a running broker
//! - Single-process applications
//! - Development and prototyping

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::channel::{BrokerChannel, BrokerConnection, Connector, DeliveryCallback};
use super::error::BrokerError;
use super::properties::{Delivery, TransportProperties};
use crate::config::ConnectionTarget;

/// How an exchange matches routing keys against its bindings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Deliver to queues bound with exactly the published routing key.
    Direct,
    /// Deliver to every bound queue, ignoring the routing key.
    Fanout,
}

/// A message as it was handed to `publish`.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub properties: TransportProperties,
    pub body: Option<Vec<u8>>,
}

/// A recorded `reject` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rejection {
    pub delivery_tag: u64,
    pub requeue: bool,
}

struct Binding {
    queue: String,
    exchange: String,
    routing_key: String,
}

struct Consumer {
    channel_id: u64,
    callback: DeliveryCallback,
}

/// A delivery handed to a consumer and not yet acked or rejected.
struct Outstanding {
    channel_id: u64,
    queue: String,
    delivery: Delivery,
}

#[derive(Default)]
struct BrokerState {
    exchanges: HashMap<String, ExchangeKind>,
    bindings: Vec<Binding>,
    queues: HashMap<String, VecDeque<Delivery>>,
    consumers: HashMap<String, Consumer>,
    outstanding: HashMap<u64, Outstanding>,
    published: Vec<PublishedMessage>,
    acked: Vec<u64>,
    rejected: Vec<Rejection>,
    dead_letters: Vec<Delivery>,
    connections: Vec<ConnectionTarget>,
    refuse_connections: bool,
    next_delivery_tag: u64,
    next_channel_id: u64,
    channels_opened: usize,
    channels_closed: usize,
}

/// In-memory broker.
///
/// Features:
/// - Thread-safe (clones share the same broker)
/// - Direct and fanout exchanges; the nameless default exchange routes
///   straight to the queue named by the routing key
/// - One consumer per queue; deliveries are pushed to the consumer's
///   callback synchronously, on the publishing thread, with no broker lock
///   held
/// - Rejected deliveries are either requeued (redelivered on the next
///   publish to that queue or on [`deliver_pending`](Self::deliver_pending))
///   or collected as dead letters
///
/// ## Example
///
/// ```
/// use envelope_mq::broker::{
///     BrokerChannel, BrokerConnection, Connector, ExchangeKind, InMemoryBroker, TransportProperties,
/// };
/// use envelope_mq::ConnectionTarget;
///
/// let broker = InMemoryBroker::new();
/// broker.declare_exchange("events", ExchangeKind::Fanout);
/// broker.declare_queue("audit");
/// broker.bind_queue("audit", "events", "").unwrap();
///
/// let connection = broker.connect(&ConnectionTarget::new("amqp://localhost:5672")).unwrap();
/// let channel = connection.create_channel().unwrap();
/// channel.publish("events", "", &TransportProperties::default(), Some(b"{}".as_slice())).unwrap();
///
/// assert_eq!(broker.queue_depth("audit"), 1);
/// assert_eq!(broker.published().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    /// Create an empty broker with no exchanges or queues.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Topology
    // =========================================================================

    /// Declare an exchange. Redeclaring replaces its kind.
    pub fn declare_exchange(&self, name: &str, kind: ExchangeKind) {
        self.state().exchanges.insert(name.to_string(), kind);
    }

    /// Declare a queue. Redeclaring an existing queue keeps its contents.
    pub fn declare_queue(&self, name: &str) {
        self.state().queues.entry(name.to_string()).or_default();
    }

    /// Bind a queue to an exchange under a routing key.
    pub fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<(), BrokerError> {
        let mut state = self.state();
        if !state.exchanges.contains_key(exchange) {
            return Err(BrokerError::UnknownExchange(exchange.to_string()));
        }
        if !state.queues.contains_key(queue) {
            return Err(BrokerError::UnknownQueue(queue.to_string()));
        }
        state.bindings.push(Binding {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        });
        Ok(())
    }

    /// Make subsequent `connect` calls fail (or succeed again).
    pub fn refuse_connections(&self, refuse: bool) {
        self.state().refuse_connections = refuse;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every message published so far, in order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state().published.clone()
    }

    /// Messages published to one exchange.
    pub fn published_to(&self, exchange: &str) -> Vec<PublishedMessage> {
        self.state()
            .published
            .iter()
            .filter(|m| m.exchange == exchange)
            .cloned()
            .collect()
    }

    /// Acknowledged delivery tags.
    pub fn acked(&self) -> Vec<u64> {
        self.state().acked.clone()
    }

    /// Recorded rejections.
    pub fn rejected(&self) -> Vec<Rejection> {
        self.state().rejected.clone()
    }

    /// Deliveries rejected without requeue.
    pub fn dead_letters(&self) -> Vec<Delivery> {
        self.state().dead_letters.clone()
    }

    /// Number of messages waiting in a queue (not yet handed to a consumer).
    pub fn queue_depth(&self, queue: &str) -> usize {
        self.state().queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Number of deliveries handed out and not yet acked or rejected.
    pub fn outstanding(&self) -> usize {
        self.state().outstanding.len()
    }

    pub fn has_consumer(&self, queue: &str) -> bool {
        self.state().consumers.contains_key(queue)
    }

    /// Number of successful `connect` calls.
    pub fn connection_count(&self) -> usize {
        self.state().connections.len()
    }

    pub fn channels_opened(&self) -> usize {
        self.state().channels_opened
    }

    pub fn open_channels(&self) -> usize {
        let state = self.state();
        state.channels_opened - state.channels_closed
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Hand every waiting message in `queue` to its consumer.
    ///
    /// Returns how many deliveries were made. Messages requeued while this
    /// runs wait for the next call.
    pub fn deliver_pending(&self, queue: &str) -> usize {
        let (callback, deliveries) = {
            let mut state = self.state();
            let Some((channel_id, callback)) = state
                .consumers
                .get(queue)
                .map(|c| (c.channel_id, Arc::clone(&c.callback)))
            else {
                return 0;
            };
            let pending: Vec<Delivery> = state
                .queues
                .get_mut(queue)
                .map(|q| q.drain(..).collect())
                .unwrap_or_default();

            let mut deliveries = Vec::with_capacity(pending.len());
            for mut delivery in pending {
                state.next_delivery_tag += 1;
                delivery.delivery_tag = state.next_delivery_tag;
                state.outstanding.insert(
                    delivery.delivery_tag,
                    Outstanding {
                        channel_id,
                        queue: queue.to_string(),
                        delivery: delivery.clone(),
                    },
                );
                deliveries.push(delivery);
            }
            (callback, deliveries)
        };

        let count = deliveries.len();
        for delivery in deliveries {
            callback(delivery);
        }
        count
    }

    fn route(state: &BrokerState, exchange: &str, routing_key: &str) -> Result<Vec<String>, BrokerError> {
        if exchange.is_empty() {
            return Ok(state
                .queues
                .contains_key(routing_key)
                .then(|| vec![routing_key.to_string()])
                .unwrap_or_default());
        }
        let kind = state
            .exchanges
            .get(exchange)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange.to_string()))?;
        Ok(state
            .bindings
            .iter()
            .filter(|b| b.exchange == exchange)
            .filter(|b| *kind == ExchangeKind::Fanout || b.routing_key == routing_key)
            .map(|b| b.queue.clone())
            .collect())
    }

    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &TransportProperties,
        body: Option<&[u8]>,
    ) -> Result<(), BrokerError> {
        let targets = {
            let mut state = self.state();
            let targets = Self::route(&state, exchange, routing_key)?;
            state.published.push(PublishedMessage {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                properties: properties.clone(),
                body: body.map(<[u8]>::to_vec),
            });
            for queue in &targets {
                let delivery = Delivery {
                    delivery_tag: 0,
                    exchange: exchange.to_string(),
                    routing_key: routing_key.to_string(),
                    redelivered: false,
                    properties: properties.clone(),
                    body: body.map(<[u8]>::to_vec),
                };
                if let Some(q) = state.queues.get_mut(queue) {
                    q.push_back(delivery);
                }
            }
            targets
        };

        for queue in targets {
            self.deliver_pending(&queue);
        }
        Ok(())
    }

    fn consume(&self, channel_id: u64, queue: &str, callback: DeliveryCallback) -> Result<String, BrokerError> {
        {
            let mut state = self.state();
            if !state.queues.contains_key(queue) {
                return Err(BrokerError::UnknownQueue(queue.to_string()));
            }
            if state.consumers.contains_key(queue) {
                return Err(BrokerError::QueueInUse(queue.to_string()));
            }
            state.consumers.insert(
                queue.to_string(),
                Consumer {
                    channel_id,
                    callback,
                },
            );
        }
        self.deliver_pending(queue);
        Ok(format!("ctag-{}-{}", channel_id, queue))
    }

    fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        let mut state = self.state();
        state
            .outstanding
            .remove(&delivery_tag)
            .ok_or(BrokerError::UnknownDeliveryTag(delivery_tag))?;
        state.acked.push(delivery_tag);
        Ok(())
    }

    fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        let mut state = self.state();
        let outstanding = state
            .outstanding
            .remove(&delivery_tag)
            .ok_or(BrokerError::UnknownDeliveryTag(delivery_tag))?;
        state.rejected.push(Rejection {
            delivery_tag,
            requeue,
        });

        let mut delivery = outstanding.delivery;
        if requeue {
            delivery.redelivered = true;
            if let Some(q) = state.queues.get_mut(&outstanding.queue) {
                q.push_front(delivery);
            }
        } else {
            state.dead_letters.push(delivery);
        }
        Ok(())
    }

    /// Drop the channel's consumers and return its unsettled deliveries to
    /// their queues.
    fn release_channel(&self, channel_id: u64) {
        let mut state = self.state();
        state.consumers.retain(|_, c| c.channel_id != channel_id);

        let unsettled: Vec<u64> = state
            .outstanding
            .iter()
            .filter(|(_, o)| o.channel_id == channel_id)
            .map(|(tag, _)| *tag)
            .collect();
        for tag in unsettled {
            if let Some(outstanding) = state.outstanding.remove(&tag) {
                let mut delivery = outstanding.delivery;
                delivery.redelivered = true;
                if let Some(q) = state.queues.get_mut(&outstanding.queue) {
                    q.push_front(delivery);
                }
            }
        }
        state.channels_closed += 1;
    }
}

impl Connector for InMemoryBroker {
    fn connect(&self, target: &ConnectionTarget) -> Result<Arc<dyn BrokerConnection>, BrokerError> {
        let mut state = self.state();
        if state.refuse_connections {
            return Err(BrokerError::ConnectionFailed(format!(
                "connection to {} refused",
                target.url
            )));
        }
        state.connections.push(target.clone());
        Ok(Arc::new(InMemoryConnection {
            broker: self.clone(),
        }))
    }
}

/// Connection handed out by [`InMemoryBroker`].
pub struct InMemoryConnection {
    broker: InMemoryBroker,
}

impl BrokerConnection for InMemoryConnection {
    fn create_channel(&self) -> Result<Arc<dyn BrokerChannel>, BrokerError> {
        let id = {
            let mut state = self.broker.state();
            state.next_channel_id += 1;
            state.channels_opened += 1;
            state.next_channel_id
        };
        Ok(Arc::new(InMemoryChannel {
            id,
            broker: self.broker.clone(),
            open: AtomicBool::new(true),
        }))
    }
}

/// Channel handed out by [`InMemoryConnection`].
pub struct InMemoryChannel {
    id: u64,
    broker: InMemoryBroker,
    open: AtomicBool,
}

impl InMemoryChannel {
    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BrokerError::ChannelClosed)
        }
    }
}

impl BrokerChannel for InMemoryChannel {
    fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        properties: &TransportProperties,
        body: Option<&[u8]>,
    ) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.broker.publish(exchange, routing_key, properties, body)
    }

    fn consume(&self, queue: &str, on_delivery: DeliveryCallback) -> Result<String, BrokerError> {
        self.ensure_open()?;
        self.broker.consume(self.id, queue, on_delivery)
    }

    fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.broker.ack(delivery_tag)
    }

    fn reject(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        self.ensure_open()?;
        self.broker.reject(delivery_tag, requeue)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) -> Result<(), BrokerError> {
        if self.open.swap(false, Ordering::SeqCst) {
            self.broker.release_channel(self.id);
        }
        Ok(())
    }
}
