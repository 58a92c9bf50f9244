//! Error types for message handlers and dispatch.

use std::error::Error;
use std::fmt;

use crate::codec::CodecError;
use crate::message::{MessageType, ParamError};
use crate::publisher::PublishError;

/// Error returned by a message handler, interceptor or unsupported handler.
#[derive(Debug)]
pub enum HandlerError {
    /// Business logic rejected the message.
    Rejected(String),
    /// Payload or parameter could not be read.
    DecodeFailed(String),
    /// Payload codec failure.
    Codec(CodecError),
    /// A reply or follow-up message could not be published.
    Publish(PublishError),
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Rejected(msg) => write!(f, "rejected: {}", msg),
            HandlerError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
            HandlerError::Codec(e) => write!(f, "codec error: {}", e),
            HandlerError::Publish(e) => write!(f, "publish error: {}", e),
            HandlerError::Other(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Codec(e) => Some(e),
            HandlerError::Publish(e) => Some(e),
            HandlerError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<CodecError> for HandlerError {
    fn from(err: CodecError) -> Self {
        HandlerError::Codec(err)
    }
}

impl From<PublishError> for HandlerError {
    fn from(err: PublishError) -> Self {
        HandlerError::Publish(err)
    }
}

impl From<ParamError> for HandlerError {
    fn from(err: ParamError) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

/// Error returned by [`HandlerRegistry::dispatch`](super::HandlerRegistry::dispatch).
#[derive(Debug)]
pub enum DispatchError {
    /// No handler matched and no unsupported-message handler is set.
    UnsupportedMessage {
        message_type: MessageType,
        name: Option<String>,
    },
    /// A handler failed and no exception handler is set, or the
    /// interceptor or unsupported handler failed.
    Handler(HandlerError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::UnsupportedMessage { message_type, name } => write!(
                f,
                "unsupported message: type={}, name={}",
                message_type,
                name.as_deref().unwrap_or("<none>")
            ),
            DispatchError::Handler(e) => write!(f, "{}", e),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DispatchError::Handler(e) => Some(e),
            DispatchError::UnsupportedMessage { .. } => None,
        }
    }
}

impl From<HandlerError> for DispatchError {
    fn from(err: HandlerError) -> Self {
        DispatchError::Handler(err)
    }
}
