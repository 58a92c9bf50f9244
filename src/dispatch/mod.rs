//! Handler registry and dispatch.
//!
//! ```text
//! Message ──► interceptor ──► lookup(type, name)
//!                                 │
//!              ┌──────────────────┼─────────────────────┐
//!              ▼                  ▼                     ▼
//!           handler        event: dropped     unsupported handler
//!              │                               or UnsupportedMessage
//!        Err ──┴──► exception handler ──► ExceptionResolution
//! ```

mod error;
mod handler;
mod registry;

pub use error::{DispatchError, HandlerError};
pub use handler::{ExceptionHandler, ExceptionResolution, LogUnsupportedHandler, MessageHandler};
pub use registry::{DispatchOutcome, HandlerRegistry};
