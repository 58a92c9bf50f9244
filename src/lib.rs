pub mod broker;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod listener;
pub mod message;
pub mod node;
pub mod protocol;
pub mod publisher;

pub use broker::{BrokerChannel, BrokerConnection, BrokerError, Connector, InMemoryBroker};
pub use codec::{CodecError, JsonCodec, PayloadCodec};
pub use config::{BrokerSettings, ConfigurationError, ConnectionTarget};
pub use dispatch::{
    DispatchError, DispatchOutcome, ExceptionHandler, ExceptionResolution, HandlerError,
    HandlerRegistry, LogUnsupportedHandler, MessageHandler,
};
pub use listener::{ListenerError, ListenerStats, QueueListener, ServiceStatus};
pub use message::{HeaderValue, Message, MessageType, ParamError, Payload};
pub use node::MessagingNode;
pub use protocol::ProtocolError;
pub use publisher::{PublishError, Publisher};
