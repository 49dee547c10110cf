//! Protocol error types.

use thiserror::Error;

use crate::kind::MessageType;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Reasons an inbound payload could not be turned into a typed message.
///
/// A decode error concerns a single message. It never implies anything about
/// the connection that carried it; the caller decides whether to drop the
/// message or the connection.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Payload exceeds the maximum accepted size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Payload is not well-formed JSON.
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Payload is valid JSON but not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be a {expected}")]
    InvalidFieldType {
        field: &'static str,
        expected: &'static str,
    },

    /// Discriminator names no known message type.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Discriminator is known but the body does not match its shape.
    #[error("invalid {message_type} payload: {source}")]
    InvalidPayload {
        message_type: MessageType,
        #[source]
        source: serde_json::Error,
    },

    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),

    /// A direct signal names its own sender as recipient.
    #[error("direct signal from {0} is addressed to itself")]
    SelfAddressed(String),
}

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Failed to serialize message to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Encoded message exceeds the maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}
