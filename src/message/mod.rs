//! The message envelope.
//!
//! A [`Message`] is the structured value exchanged between publishers and
//! handlers, independent of how it travels on the wire. Three kinds are
//! sent by application code (events, tasks, task results); `Error` and
//! `Unknown` only ever arrive from the outside.

mod error;
mod header;
#[allow(clippy::module_inception)]
mod message;
mod message_type;
mod payload;

pub use error::ParamError;
pub use header::HeaderValue;
pub use message::Message;
pub use message_type::{MessageType, TYPE_ERROR, TYPE_EVENT, TYPE_TASK, TYPE_TASK_RESULT};
pub use payload::Payload;

/// Well-known liveness event sent to probe peers.
pub const EVENT_PING: &str = "PING";
/// Reply to [`EVENT_PING`].
pub const EVENT_PONG: &str = "PONG";
