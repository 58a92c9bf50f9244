//! Message type classification.

use std::fmt;

/// Literal carried in the `message_type` header for tasks.
pub const TYPE_TASK: &str = "task";
/// Literal carried in the `message_type` header for task results.
pub const TYPE_TASK_RESULT: &str = "task_result";
/// Literal carried in the `message_type` header for events.
pub const TYPE_EVENT: &str = "event";
/// Literal carried in the `message_type` header for errors.
pub const TYPE_ERROR: &str = "error";

/// The kind of an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Event,
    Task,
    TaskResult,
    Error,
    Unknown,
}

impl MessageType {
    /// Classify a raw type string, case-insensitively.
    ///
    /// Anything that is not one of the four known literals, including a
    /// missing value, classifies as `Unknown`.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return MessageType::Unknown;
        };
        match raw.to_ascii_lowercase().as_str() {
            TYPE_TASK => MessageType::Task,
            TYPE_TASK_RESULT => MessageType::TaskResult,
            TYPE_EVENT => MessageType::Event,
            TYPE_ERROR => MessageType::Error,
            _ => MessageType::Unknown,
        }
    }

    /// Upper-case name written to the wire on encode.
    pub fn name(&self) -> &'static str {
        match self {
            MessageType::Event => "EVENT",
            MessageType::Task => "TASK",
            MessageType::TaskResult => "TASK_RESULT",
            MessageType::Error => "ERROR",
            MessageType::Unknown => "UNKNOWN",
        }
    }

    /// Whether handlers can be registered for this type.
    pub fn accepts_handlers(&self) -> bool {
        matches!(
            self,
            MessageType::Event | MessageType::Task | MessageType::TaskResult
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
