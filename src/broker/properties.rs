//! Transport-level message metadata.

use std::collections::HashMap;

use crate::message::HeaderValue;

/// A header block.
pub type Headers = HashMap<String, HeaderValue>;

/// Broker message properties.
///
/// `headers` is `None` when the delivery carried no header block at all,
/// which is different from an empty one.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransportProperties {
    pub app_id: Option<String>,
    pub message_id: Option<String>,
    pub correlation_id: Option<String>,
    pub content_type: Option<String>,
    /// Unix timestamp in seconds.
    pub timestamp: Option<i64>,
    pub headers: Option<Headers>,
}

impl TransportProperties {
    /// Read a header, if the header block exists and holds the key.
    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.headers.as_ref()?.get(key)
    }
}

/// A message handed to a consumer.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    /// Identifies this delivery for `ack` / `reject`.
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    /// Set when the message was requeued and delivered again.
    pub redelivered: bool,
    pub properties: TransportProperties,
    pub body: Option<Vec<u8>>,
}
