use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use super::error::ProtocolError;
use super::{
    HEADER_MESSAGE_TYPE, HEADER_NAME, HEADER_PAYLOAD_CLASS, HEADER_PROTOCOL_VERSION,
    HEADER_RESULT_CODE, HEADER_RESULT_MESSAGE, PROTOCOL_VERSION_DEFAULT,
};
use crate::broker::{Delivery, Headers, TransportProperties};
use crate::codec::{CodecError, PayloadCodec};
use crate::message::{HeaderValue, Message, MessageType, Payload};

/// An encoded message, ready to hand to a channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Encoded {
    pub properties: TransportProperties,
    pub body: Option<Vec<u8>>,
}

/// Classify a raw type literal. Case-insensitive; unknown or missing
/// literals classify as `Unknown`.
pub fn classify(raw: Option<&str>) -> MessageType {
    MessageType::classify(raw)
}

/// Build transport properties for `message`.
///
/// Assigns a message id and the default protocol version when missing, so
/// the message reflects exactly what went out. `app_id` identifies the
/// sending component and is stamped regardless of the message's own
/// `sender_id`.
pub fn encode_properties(message: &mut Message, app_id: &str) -> TransportProperties {
    let message_id = message.ensure_message_id().to_string();
    let protocol_version = message
        .protocol_version
        .get_or_insert_with(|| PROTOCOL_VERSION_DEFAULT.to_string())
        .clone();

    let type_header = match (message.message_type, &message.type_original) {
        (Some(ty), _) => HeaderValue::Str(ty.name().to_string()),
        (None, Some(raw)) => HeaderValue::Str(raw.clone()),
        (None, None) => HeaderValue::Void,
    };

    let mut headers: Headers = message.params.clone();
    let structural = [
        (HEADER_MESSAGE_TYPE, type_header),
        (HEADER_PROTOCOL_VERSION, HeaderValue::Str(protocol_version)),
        (HEADER_NAME, message.name.clone().into()),
        (HEADER_PAYLOAD_CLASS, message.payload_class().map(str::to_string).into()),
        (HEADER_RESULT_MESSAGE, message.result.clone().into()),
        (HEADER_RESULT_CODE, message.result_code.into()),
    ];
    for (key, value) in structural {
        trace!(header = key, value = %value, "header");
        headers.insert(key.to_string(), value);
    }

    TransportProperties {
        app_id: Some(app_id.to_string()),
        message_id: Some(message_id),
        correlation_id: message.process_id.clone(),
        content_type: message.content_type.clone(),
        timestamp: Some(message.timestamp.timestamp()),
        headers: Some(headers),
    }
}

/// Serialize the message payload into a body. `Unset` yields no body.
pub fn encode_body(codec: &dyn PayloadCodec, message: &Message) -> Result<Option<Vec<u8>>, CodecError> {
    codec.serialize(message.payload())
}

/// Encode properties and body together.
pub fn encode(
    codec: &dyn PayloadCodec,
    message: &mut Message,
    app_id: &str,
) -> Result<Encoded, CodecError> {
    let properties = encode_properties(message, app_id);
    let body = encode_body(codec, message)?;
    Ok(Encoded { properties, body })
}

fn header_text(headers: &Headers, key: &str) -> Option<String> {
    headers.get(key).and_then(HeaderValue::to_text)
}

fn header_result_code(headers: &Headers) -> Result<Option<i32>, ProtocolError> {
    match headers.get(HEADER_RESULT_CODE) {
        None | Some(HeaderValue::Void) => Ok(None),
        Some(HeaderValue::Int(code)) => i32::try_from(*code)
            .map(Some)
            .map_err(|_| ProtocolError::malformed(HEADER_RESULT_CODE, format!("{} is out of range", code))),
        Some(other) => Err(ProtocolError::malformed(
            HEADER_RESULT_CODE,
            format!("expected an integer, found {:?}", other),
        )),
    }
}

fn body_payload(body: Option<&[u8]>) -> Payload {
    match body {
        None => Payload::Unset,
        Some(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Payload::Text(text.to_string()),
            Err(_) => Payload::Bytes(bytes.to_vec()),
        },
    }
}

/// Rebuild a message from a delivery.
pub fn decode(delivery: &Delivery) -> Result<Message, ProtocolError> {
    let properties = &delivery.properties;
    let headers = properties
        .headers
        .as_ref()
        .ok_or(ProtocolError::MissingHeaders)?;

    let type_original = header_text(headers, HEADER_MESSAGE_TYPE);
    let message_type = classify(type_original.as_deref());
    let result_code = header_result_code(headers)?;

    let timestamp = match properties.timestamp {
        Some(secs) => {
            DateTime::<Utc>::from_timestamp(secs, 0).ok_or(ProtocolError::InvalidTimestamp(secs))?
        }
        None => Utc::now(),
    };

    let mut message = Message::default();
    message.protocol_version = Some(
        header_text(headers, HEADER_PROTOCOL_VERSION)
            .unwrap_or_else(|| PROTOCOL_VERSION_DEFAULT.to_string()),
    );
    message.message_id = properties.message_id.clone();
    message.sender_id = properties.app_id.clone();
    message.message_type = Some(message_type);
    message.type_original = type_original;
    message.timestamp = timestamp;
    message.name = header_text(headers, HEADER_NAME);
    message.result = header_text(headers, HEADER_RESULT_MESSAGE);
    message.result_code = result_code;
    message.params = headers.clone();
    message.content_type = properties.content_type.clone();
    message.routing_key = Some(delivery.routing_key.clone());
    message.process_id = properties.correlation_id.clone();
    message.set_received_payload(
        body_payload(delivery.body.as_deref()),
        header_text(headers, HEADER_PAYLOAD_CLASS),
    );

    debug!(
        message_id = ?message.message_id,
        message_type = %message_type,
        name = ?message.name,
        "decoded message"
    );
    Ok(message)
}
