use std::error::Error;
use std::fmt;

/// Error returned by typed parameter accessors when a value is present
/// but cannot be read as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    NotUuid { key: String, value: String },
    NotDate { key: String, value: String },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::NotUuid { key, value } => {
                write!(f, "parameter {} is not a UUID: {}", key, value)
            }
            ParamError::NotDate { key, value } => {
                write!(f, "parameter {} is not a date (yyyy-MM-dd): {}", key, value)
            }
        }
    }
}

impl Error for ParamError {}
