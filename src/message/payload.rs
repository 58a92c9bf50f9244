//! Envelope payloads.

use std::any::type_name;

use serde::Serialize;
use serde_json::Value;

use crate::codec::CodecError;

/// The payload of an envelope.
///
/// What a payload holds depends on where the message is in the pipeline:
/// outbound messages usually carry a `Typed` value, inbound messages carry
/// the raw body as `Text` (or `Bytes` when the body is not UTF-8). Turning
/// `Text`/`Bytes` back into a typed value is an explicit codec operation,
/// see [`Message::payload_as`](super::Message::payload_as).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    Unset,
    Bytes(Vec<u8>),
    Text(String),
    /// A structured value plus the name of the type it was built from.
    Typed { class: String, value: Value },
}

impl Payload {
    /// Capture a serializable value, tagging it with its type name.
    pub fn typed<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        let value = serde_json::to_value(value).map_err(CodecError::Serialize)?;
        Ok(Payload::Typed {
            class: type_name::<T>().to_string(),
            value,
        })
    }

    /// The shape tag for this payload. `Unset` has none.
    pub fn class(&self) -> Option<String> {
        match self {
            Payload::Unset => None,
            Payload::Bytes(_) => Some(type_name::<Vec<u8>>().to_string()),
            Payload::Text(_) => Some(type_name::<String>().to_string()),
            Payload::Typed { class, .. } => Some(class.clone()),
        }
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Payload::Unset)
    }

    /// Get the payload as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Payload::Bytes(value)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Unset
    }
}
