//! Payload codecs.
//!
//! The protocol layer never interprets payload bytes itself. Outbound it asks
//! a [`PayloadCodec`] to turn a [`Payload`] into a body; inbound the body is
//! kept as text until a consumer asks for a typed value through
//! [`Message::payload_as`](crate::Message::payload_as).

use std::error::Error;
use std::fmt;

use serde_json::Value;

use crate::message::Payload;

/// Content type advertised by [`JsonCodec`].
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Error raised by a payload codec.
#[derive(Debug)]
pub enum CodecError {
    /// The payload could not be serialized.
    Serialize(serde_json::Error),
    /// The input is not valid for the requested shape.
    Malformed {
        shape: String,
        source: serde_json::Error,
    },
    /// The payload was built from a different type than the one requested.
    ShapeMismatch { expected: String, actual: String },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Serialize(e) => write!(f, "payload serialization failed: {}", e),
            CodecError::Malformed { shape, source } => {
                write!(f, "payload cannot be read as {}: {}", shape, source)
            }
            CodecError::ShapeMismatch { expected, actual } => write!(
                f,
                "payload shape mismatch: expected {}, found {}",
                expected, actual
            ),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CodecError::Serialize(e) => Some(e),
            CodecError::Malformed { source, .. } => Some(source),
            CodecError::ShapeMismatch { .. } => None,
        }
    }
}

/// Converts payloads to and from message bodies.
pub trait PayloadCodec: Send + Sync {
    /// Content type stamped on outbound messages.
    fn content_type(&self) -> &str;

    /// Serialize a payload into a body. `Unset` yields no body.
    fn serialize(&self, payload: &Payload) -> Result<Option<Vec<u8>>, CodecError>;

    /// Parse a body into a structured value. `shape` names the type the
    /// caller is after and is only used for error reporting.
    fn deserialize(&self, bytes: &[u8], shape: &str) -> Result<Value, CodecError>;
}

/// JSON codec backed by `serde_json`.
///
/// Text and byte payloads are passed through untouched on the assumption
/// that they already hold JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        JsonCodec
    }
}

impl PayloadCodec for JsonCodec {
    fn content_type(&self) -> &str {
        CONTENT_TYPE_JSON
    }

    fn serialize(&self, payload: &Payload) -> Result<Option<Vec<u8>>, CodecError> {
        match payload {
            Payload::Unset => Ok(None),
            Payload::Bytes(bytes) => Ok(Some(bytes.clone())),
            Payload::Text(text) => Ok(Some(text.clone().into_bytes())),
            Payload::Typed { value, .. } => serde_json::to_vec(value)
                .map(Some)
                .map_err(CodecError::Serialize),
        }
    }

    fn deserialize(&self, bytes: &[u8], shape: &str) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|source| CodecError::Malformed {
            shape: shape.to_string(),
            source,
        })
    }
}
