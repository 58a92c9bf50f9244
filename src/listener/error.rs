use std::error::Error;
use std::fmt;

use crate::broker::BrokerError;
use crate::config::ConfigurationError;

/// Error type for listener start / stop.
#[derive(Debug)]
pub enum ListenerError {
    Configuration(ConfigurationError),
    Broker(BrokerError),
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerError::Configuration(e) => write!(f, "listener configuration error: {}", e),
            ListenerError::Broker(e) => write!(f, "listener broker error: {}", e),
        }
    }
}

impl Error for ListenerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ListenerError::Configuration(e) => Some(e),
            ListenerError::Broker(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for ListenerError {
    fn from(err: ConfigurationError) -> Self {
        ListenerError::Configuration(err)
    }
}

impl From<BrokerError> for ListenerError {
    fn from(err: BrokerError) -> Self {
        ListenerError::Broker(err)
    }
}
