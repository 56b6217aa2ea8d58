//! Client input validation errors.
//!
//! Each variant displays as the literal string returned to the client in the
//! acknowledgement's `error` field.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid message format")]
    InvalidFormat,

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid position")]
    InvalidPosition,

    #[error("Invalid decision")]
    InvalidDecision,
}

impl ValidationError {
    /// Short label used for metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "format",
            Self::UnknownEvent(_) => "event",
            Self::InvalidPosition => "position",
            Self::InvalidDecision => "decision",
        }
    }
}
