//! Mapping between messages and broker transport metadata.
//!
//! Outbound, a [`Message`](crate::Message) becomes transport properties, a
//! header block and an optional body. Inbound, a [`Delivery`](crate::broker::Delivery)
//! becomes a message again. Six headers carry the envelope structure;
//! everything else in the header block is an application parameter.
//!
//! | Header             | Envelope field                 |
//! |--------------------|--------------------------------|
//! | `message_type`     | `message_type` / `type_original` |
//! | `protocol_version` | `protocol_version`             |
//! | `name`             | `name`                         |
//! | `payload_class`    | `payload_class`                |
//! | `result_message`   | `result`                       |
//! | `result_code`      | `result_code`                  |

mod error;
mod mapper;

pub use error::ProtocolError;
pub use mapper::{classify, decode, encode, encode_body, encode_properties, Encoded};

pub const PROTOCOL_VERSION_1_0: &str = "1.0";
pub const PROTOCOL_VERSION_1_1: &str = "1.1";
/// Version stamped on messages that do not carry one.
pub const PROTOCOL_VERSION_DEFAULT: &str = PROTOCOL_VERSION_1_1;

pub const HEADER_NAME: &str = "name";
pub const HEADER_RESULT_CODE: &str = "result_code";
pub const HEADER_RESULT_MESSAGE: &str = "result_message";
pub const HEADER_PROTOCOL_VERSION: &str = "protocol_version";
pub const HEADER_PAYLOAD_CLASS: &str = "payload_class";
pub const HEADER_MESSAGE_TYPE: &str = "message_type";

/// The six structural header keys.
pub const STRUCTURAL_HEADERS: [&str; 6] = [
    HEADER_MESSAGE_TYPE,
    HEADER_PROTOCOL_VERSION,
    HEADER_NAME,
    HEADER_PAYLOAD_CLASS,
    HEADER_RESULT_MESSAGE,
    HEADER_RESULT_CODE,
];
