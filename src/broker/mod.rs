//! Broker abstractions.
//!
//! The messaging core never talks to a broker directly. It depends on three
//! small capabilities and the transport types they exchange.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Publisher / QueueListener                       │
//! │  - encode/decode through the protocol mapper                │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │      Connector → BrokerConnection → BrokerChannel            │
//! │  publish / consume / ack / reject / close                   │
//! └─────────────────────────────────────────────────────────────┘
//!          │                                  │
//!          ▼                                  ▼
//! ┌──────────────────┐              ┌─────────────────────────┐
//! │ InMemoryBroker   │              │ AMQP client adapter     │
//! │   (included)     │              │      (external)         │
//! └──────────────────┘              └─────────────────────────┘
//! ```

mod channel;
mod error;
mod in_memory;
mod properties;

pub use channel::{BrokerChannel, BrokerConnection, Connector, DeliveryCallback};
pub use error::BrokerError;
pub use in_memory::{
    ExchangeKind, InMemoryBroker, InMemoryChannel, InMemoryConnection, PublishedMessage, Rejection,
};
pub use properties::{Delivery, Headers, TransportProperties};
