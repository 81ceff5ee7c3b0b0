//! Protocol error types.

use thiserror::Error;

/// Result alias for wire-level operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input was not valid JSON or did not match the expected shape
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// Message carried an `@type` outside the present-proof family
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Message had no `@type` member at all
    #[error("message has no @type")]
    MissingType,

    /// A message that must carry an attachment had none
    #[error("message {message_type} has no attachment")]
    MissingAttachment {
        /// Type of the offending message
        message_type: &'static str,
    },

    /// Attachment content could not be decoded
    #[error("invalid attachment {id}: {reason}")]
    InvalidAttachment {
        /// Attachment `@id`
        id: String,
        /// Why decoding failed
        reason: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}
