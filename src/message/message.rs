use std::any::type_name;
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::error::ParamError;
use super::header::HeaderValue;
use super::message_type::MessageType;
use super::payload::Payload;
use crate::codec::{CodecError, PayloadCodec};
use crate::protocol::PROTOCOL_VERSION_DEFAULT;

/// The envelope exchanged between publishers and handlers.
///
/// Most fields are plain data. The payload and its shape tag are kept
/// private so that `payload_class` always reflects the last payload
/// assignment; use [`set_payload`](Self::set_payload) /
/// [`with_payload`](Self::with_payload) to change them together.
///
/// ## Example
///
/// ```
/// use envelope_mq::{Message, MessageType};
///
/// let message = Message::task("resize")
///     .with_payload("{\"width\":640}")
///     .with_param("tenant", "acme");
///
/// assert_eq!(message.message_type, Some(MessageType::Task));
/// assert_eq!(message.param_as_string("tenant").as_deref(), Some("acme"));
/// assert!(message.payload_class().is_some());
/// ```
#[derive(Clone, Debug)]
pub struct Message {
    pub protocol_version: Option<String>,
    pub message_id: Option<String>,
    pub sender_id: Option<String>,
    /// Explicit type. Takes precedence over `type_original` when routing.
    pub message_type: Option<MessageType>,
    /// The raw type string as received, kept for diagnostics.
    pub type_original: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub name: Option<String>,
    // task result fields
    pub source_message_id: Option<String>,
    pub source_sender_id: Option<String>,
    pub result: Option<String>,
    pub result_code: Option<i32>,
    pub params: HashMap<String, HeaderValue>,
    pub content_type: Option<String>,
    pub routing_key: Option<String>,
    /// Carried as the transport correlation id.
    pub process_id: Option<String>,
    payload: Payload,
    payload_class: Option<String>,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            protocol_version: Some(PROTOCOL_VERSION_DEFAULT.to_string()),
            message_id: None,
            sender_id: None,
            message_type: None,
            type_original: None,
            timestamp: Utc::now(),
            name: None,
            source_message_id: None,
            source_sender_id: None,
            result: None,
            result_code: None,
            params: HashMap::new(),
            content_type: None,
            routing_key: None,
            process_id: None,
            payload: Payload::Unset,
            payload_class: None,
        }
    }
}

impl Message {
    /// Create a message of the given type and name.
    pub fn new(message_type: MessageType, name: impl Into<String>) -> Self {
        Self {
            message_type: Some(message_type),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self::new(MessageType::Event, name)
    }

    pub fn task(name: impl Into<String>) -> Self {
        Self::new(MessageType::Task, name)
    }

    pub fn task_result(name: impl Into<String>) -> Self {
        Self::new(MessageType::TaskResult, name)
    }

    /// The type used for routing: the explicit type if set, otherwise the
    /// classification of the raw type string.
    pub fn resolved_type(&self) -> MessageType {
        self.message_type
            .unwrap_or_else(|| MessageType::classify(self.type_original.as_deref()))
    }

    /// Assign a message id unless one is already present. Returns the id.
    pub fn ensure_message_id(&mut self) -> &str {
        self.message_id
            .get_or_insert_with(|| Uuid::new_v4().to_string())
            .as_str()
    }

    // =========================================================================
    // Payload
    // =========================================================================

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_class(&self) -> Option<&str> {
        self.payload_class.as_deref()
    }

    /// Replace the payload; the shape tag follows it.
    pub fn set_payload(&mut self, payload: impl Into<Payload>) {
        let payload = payload.into();
        self.payload_class = payload.class();
        self.payload = payload;
    }

    /// Clear the payload and its shape tag.
    pub fn clear_payload(&mut self) {
        self.payload = Payload::Unset;
        self.payload_class = None;
    }

    /// Builder form of [`set_payload`](Self::set_payload).
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.set_payload(payload);
        self
    }

    /// Install a payload received off the wire together with the class the
    /// sender declared for it.
    pub(crate) fn set_received_payload(&mut self, payload: Payload, class: Option<String>) {
        self.payload = payload;
        self.payload_class = class;
    }

    /// Resolve the payload into `T` using the given codec.
    ///
    /// - `Unset` resolves to `None`.
    /// - `Typed` values are returned directly when they were built from `T`;
    ///   a value built from another type is a shape mismatch.
    /// - `Text` and `Bytes` are handed to the codec; a received
    ///   `payload_class` is not compared against `T`.
    pub fn payload_as<T: DeserializeOwned>(
        &self,
        codec: &dyn PayloadCodec,
    ) -> Result<Option<T>, CodecError> {
        let shape = type_name::<T>();
        let value = match &self.payload {
            Payload::Unset => return Ok(None),
            Payload::Typed { class, value } => {
                if class != shape {
                    return Err(CodecError::ShapeMismatch {
                        expected: shape.to_string(),
                        actual: class.clone(),
                    });
                }
                value.clone()
            }
            Payload::Text(text) => codec.deserialize(text.as_bytes(), shape)?,
            Payload::Bytes(bytes) => codec.deserialize(bytes, shape)?,
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|source| CodecError::Malformed {
                shape: shape.to_string(),
                source,
            })
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    pub fn param(&self, key: &str) -> Option<&HeaderValue> {
        self.params.get(key)
    }

    /// Text form of a parameter. Void values read as absent.
    pub fn param_as_string(&self, key: &str) -> Option<String> {
        self.params.get(key).and_then(HeaderValue::to_text)
    }

    /// Integer form of a parameter. Values that do not parse read as absent.
    pub fn param_as_integer(&self, key: &str) -> Option<i64> {
        match self.params.get(key)? {
            HeaderValue::Int(i) => Some(*i),
            other => other.to_text()?.trim().parse().ok(),
        }
    }

    pub fn param_as_uuid(&self, key: &str) -> Result<Option<Uuid>, ParamError> {
        let Some(value) = self.param_as_string(key) else {
            return Ok(None);
        };
        Uuid::parse_str(&value)
            .map(Some)
            .map_err(|_| ParamError::NotUuid {
                key: key.to_string(),
                value,
            })
    }

    /// Date form of a parameter, written as `yyyy-MM-dd`.
    pub fn param_as_date(&self, key: &str) -> Result<Option<NaiveDate>, ParamError> {
        let Some(value) = self.param_as_string(key) else {
            return Ok(None);
        };
        NaiveDate::parse_from_str(&value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| ParamError::NotDate {
                key: key.to_string(),
                value,
            })
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<HeaderValue>) -> Self {
        self.add_param(key, value);
        self
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_message_id(mut self, id: impl Into<String>) -> Self {
        self.message_id = Some(id.into());
        self
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn with_process_id(mut self, process_id: impl Into<String>) -> Self {
        self.process_id = Some(process_id.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = Some(routing_key.into());
        self
    }

    /// Set the outcome fields of a task result.
    pub fn with_result(mut self, code: Option<i32>, message: Option<&str>) -> Self {
        self.result_code = code;
        self.result = message.map(str::to_string);
        self
    }

    /// Point a task result at the task it answers.
    pub fn with_source(mut self, source: Option<&Message>) -> Self {
        self.source_message_id = source.and_then(|m| m.message_id.clone());
        self.source_sender_id = source.and_then(|m| m.sender_id.clone());
        self
    }
}
