use std::error::Error;
use std::fmt;

/// A delivery could not be mapped into a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The delivery carried no header block.
    MissingHeaders,
    /// A structural header holds a value of the wrong kind or range.
    MalformedHeader { header: String, reason: String },
    /// The transport timestamp is not a representable point in time.
    InvalidTimestamp(i64),
}

impl ProtocolError {
    pub(crate) fn malformed(header: &str, reason: impl Into<String>) -> Self {
        ProtocolError::MalformedHeader {
            header: header.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::MissingHeaders => write!(f, "message has no headers"),
            ProtocolError::MalformedHeader { header, reason } => {
                write!(f, "malformed header {}: {}", header, reason)
            }
            ProtocolError::InvalidTimestamp(ts) => write!(f, "invalid timestamp: {}", ts),
        }
    }
}

impl Error for ProtocolError {}
