//! Messaging integration tests.
//!
//! Every suite runs against `InMemoryBroker`, which delivers synchronously
//! on the publishing thread, so assertions can follow a send directly.

mod round_trip;
mod dispatch;
mod listener;
mod request_reply;
