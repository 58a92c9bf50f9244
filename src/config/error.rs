use std::error::Error;
use std::fmt;

use crate::message::MessageType;

/// The two exchange roles the messaging layer publishes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExchangeRole {
    Tasks,
    Events,
}

impl fmt::Display for ExchangeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeRole::Tasks => f.write_str("tasks"),
            ExchangeRole::Events => f.write_str("events"),
        }
    }
}

/// A required setting is missing or a setting is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The listener has no queue to consume.
    MissingQueue,
    /// No exchange configured for the given role.
    MissingExchange(ExchangeRole),
    /// Neither a URL nor a host is configured.
    MissingConnectionTarget,
    /// Handlers cannot be registered for this message type.
    UnsupportedHandlerType(MessageType),
    /// Settings could not be read or parsed.
    Invalid(String),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingQueue => write!(f, "queue is not specified"),
            ConfigurationError::MissingExchange(role) => {
                write!(f, "{} exchange name is not specified", role)
            }
            ConfigurationError::MissingConnectionTarget => {
                write!(f, "connection is not configured: both url and host are empty")
            }
            ConfigurationError::UnsupportedHandlerType(ty) => {
                write!(f, "type is not supported for registering handlers: {}", ty)
            }
            ConfigurationError::Invalid(msg) => write!(f, "invalid settings: {}", msg),
        }
    }
}

impl Error for ConfigurationError {}
