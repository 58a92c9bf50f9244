//! Outbound envelopes.
//!
//! [`Publisher`] builds events, tasks and task results from the configured
//! identity and exchanges, encodes them through the protocol mapper and
//! hands them to a broker channel.
//!
//! - events go to the events exchange with an empty routing key
//! - tasks go to the tasks exchange with the caller's routing key
//! - task results go to the tasks exchange, routed back to the sender of
//!   the task they answer
//!
//! The broker connection is opened on the first send and reused. Every
//! send opens its own channel and closes it afterwards.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use envelope_mq::broker::{ExchangeKind, InMemoryBroker};
//! use envelope_mq::config::BrokerSettings;
//! use envelope_mq::publisher::Publisher;
//! use envelope_mq::JsonCodec;
//!
//! let broker = InMemoryBroker::new();
//! broker.declare_exchange("events", ExchangeKind::Fanout);
//!
//! let publisher = Publisher::new(
//!     Arc::new(BrokerSettings::default().with_app_id("billing")),
//!     Arc::new(broker.clone()),
//!     Arc::new(JsonCodec),
//! );
//!
//! let sent = publisher.send_event("invoice.paid", "{\"id\":7}").unwrap();
//! assert!(sent.message_id.is_some());
//! assert_eq!(broker.published_to("events").len(), 1);
//! ```

mod error;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::broker::{BrokerChannel, BrokerConnection, Connector};
use crate::codec::PayloadCodec;
use crate::config::{BrokerSettings, ExchangeRole};
use crate::message::{Message, Payload};
use crate::protocol;

pub use error::PublishError;

/// Sends messages on behalf of one application identity.
pub struct Publisher {
    settings: Arc<BrokerSettings>,
    connector: Arc<dyn Connector>,
    codec: Arc<dyn PayloadCodec>,
    connection: Mutex<Option<Arc<dyn BrokerConnection>>>,
}

impl Publisher {
    pub fn new(
        settings: Arc<BrokerSettings>,
        connector: Arc<dyn Connector>,
        codec: Arc<dyn PayloadCodec>,
    ) -> Self {
        Self {
            settings,
            connector,
            codec,
            connection: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    pub fn codec(&self) -> &dyn PayloadCodec {
        self.codec.as_ref()
    }

    /// Whether a broker connection has been opened.
    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the cached connection. The next send reconnects.
    pub fn disconnect(&self) {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn outbound(&self, message: Message) -> Message {
        message
            .with_sender(self.settings.app_id.clone())
            .with_content_type(self.codec.content_type())
    }

    // =========================================================================
    // Envelope kinds
    // =========================================================================

    /// Publish an event to the events exchange.
    pub fn send_event(
        &self,
        name: &str,
        payload: impl Into<Payload>,
    ) -> Result<Message, PublishError> {
        let exchange = self.settings.require_exchange(ExchangeRole::Events)?;
        let message = self.outbound(Message::event(name).with_payload(payload));
        self.send_message(message, exchange, "")
    }

    /// Publish a task to the tasks exchange under `routing_key`.
    pub fn send_task(
        &self,
        name: &str,
        payload: impl Into<Payload>,
        routing_key: &str,
    ) -> Result<Message, PublishError> {
        let exchange = self.settings.require_exchange(ExchangeRole::Tasks)?;
        let message = self.outbound(
            Message::task(name)
                .with_payload(payload)
                .with_routing_key(routing_key),
        );
        self.send_message(message, exchange, routing_key)
    }

    /// Publish the result of a task.
    ///
    /// The result is routed to the sender of `source`, or with an empty
    /// routing key when the source (or its sender) is unknown.
    pub fn send_task_result(
        &self,
        name: &str,
        payload: impl Into<Payload>,
        result_code: Option<i32>,
        result_message: Option<&str>,
        source: Option<&Message>,
    ) -> Result<Message, PublishError> {
        let exchange = self.settings.require_exchange(ExchangeRole::Tasks)?;
        let mut message = self.outbound(
            Message::task_result(name)
                .with_payload(payload)
                .with_result(result_code, result_message)
                .with_source(source),
        );
        message.routing_key = message.source_sender_id.clone();
        let routing_key = message.routing_key.clone().unwrap_or_default();
        self.send_message(message, exchange, &routing_key)
    }

    /// Encode and publish a prepared message.
    ///
    /// Returns the message as sent, with its message id assigned.
    pub fn send_message(
        &self,
        mut message: Message,
        exchange: &str,
        routing_key: &str,
    ) -> Result<Message, PublishError> {
        let connection = self.ensure_connection()?;
        let channel = match connection.create_channel() {
            Ok(channel) => channel,
            Err(err) => {
                warn!(error = %err, "channel open failed, dropping connection");
                self.disconnect();
                return Err(PublishError::Transport(err));
            }
        };

        let sent = self.publish_on(channel.as_ref(), &mut message, exchange, routing_key);
        let closed = channel.close();
        sent?;
        closed.map_err(PublishError::Transport)?;

        debug!(
            message_id = ?message.message_id,
            message_type = %message.resolved_type(),
            name = ?message.name,
            exchange,
            routing_key,
            "message sent"
        );
        Ok(message)
    }

    fn publish_on(
        &self,
        channel: &dyn BrokerChannel,
        message: &mut Message,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), PublishError> {
        let encoded = protocol::encode(self.codec.as_ref(), message, &self.settings.app_id)?;
        channel
            .publish(
                exchange,
                routing_key,
                &encoded.properties,
                encoded.body.as_deref(),
            )
            .map_err(PublishError::Transport)
    }

    fn ensure_connection(&self) -> Result<Arc<dyn BrokerConnection>, PublishError> {
        let mut connection = self
            .connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = connection.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let target = self.settings.connection_target()?;
        debug!(url = %target.url, "opening publisher connection");
        let opened = self
            .connector
            .connect(&target)
            .map_err(PublishError::Connection)?;
        *connection = Some(Arc::clone(&opened));
        Ok(opened)
    }
}
