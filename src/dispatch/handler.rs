use std::error::Error;

use tracing::info;

use super::error::HandlerError;
use crate::message::Message;

/// Handles one decoded message.
///
/// Implemented for any `Fn(&Message) -> Result<(), HandlerError>`, so plain
/// closures can be registered directly.
pub trait MessageHandler: Send + Sync {
    fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        self(message)
    }
}

/// What to do with a delivery whose handler failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExceptionResolution {
    /// Reject without requeue.
    #[default]
    Default,
    /// Reject and ask the broker to redeliver.
    Requeue,
}

/// Decides how a failed message is acknowledged.
pub trait ExceptionHandler: Send + Sync {
    fn handle_exception(&self, message: &Message, error: &(dyn Error + 'static))
        -> ExceptionResolution;
}

impl<F> ExceptionHandler for F
where
    F: Fn(&Message, &(dyn Error + 'static)) -> ExceptionResolution + Send + Sync,
{
    fn handle_exception(
        &self,
        message: &Message,
        error: &(dyn Error + 'static),
    ) -> ExceptionResolution {
        self(message, error)
    }
}

/// Unsupported-message handler that logs and accepts the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogUnsupportedHandler;

impl MessageHandler for LogUnsupportedHandler {
    fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        info!(
            message_id = ?message.message_id,
            sender_id = ?message.sender_id,
            message_type = %message.resolved_type(),
            name = ?message.name,
            "unsupported message"
        );
        Ok(())
    }
}
