use std::error::Error;
use std::fmt;

use crate::broker::BrokerError;
use crate::codec::CodecError;
use crate::config::ConfigurationError;

/// Error type for publish operations.
#[derive(Debug)]
pub enum PublishError {
    /// A required setting (exchange, connection target) is missing.
    Configuration(ConfigurationError),
    /// Connecting to the broker failed.
    Connection(BrokerError),
    /// The payload could not be encoded.
    Encode(CodecError),
    /// Opening a channel, publishing or closing the channel failed.
    Transport(BrokerError),
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishError::Configuration(e) => write!(f, "configuration error: {}", e),
            PublishError::Connection(e) => write!(f, "connection failed: {}", e),
            PublishError::Encode(e) => write!(f, "encode failed: {}", e),
            PublishError::Transport(e) => write!(f, "send failed: {}", e),
        }
    }
}

impl Error for PublishError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PublishError::Configuration(e) => Some(e),
            PublishError::Connection(e) => Some(e),
            PublishError::Encode(e) => Some(e),
            PublishError::Transport(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for PublishError {
    fn from(err: ConfigurationError) -> Self {
        PublishError::Configuration(err)
    }
}

impl From<CodecError> for PublishError {
    fn from(err: CodecError) -> Self {
        PublishError::Encode(err)
    }
}
