//! Signaling error types.

use thiserror::Error;

use crossfire_core::ConnectionId;
use crossfire_protocol::{DecodeError, ErrorCode, MessageType, ProtocolError};

use crate::router::Unroutable;
use crate::session::ConnectionPhase;

/// Result type for signaling operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors raised while driving a connection through the protocol.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Inbound payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Outbound message could not be encoded.
    #[error("encode error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Message is well formed but not allowed in the connection's state.
    #[error("protocol violation: {message_type} not allowed while {phase}: {reason}")]
    ProtocolViolation {
        phase: ConnectionPhase,
        message_type: MessageType,
        reason: String,
    },

    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(String),

    #[error("authentication failed for profile {0}")]
    AuthenticationFailed(String),

    /// A valid signal had nowhere to go.
    #[error("unroutable signal: {0}")]
    Unroutable(#[from] Unroutable),

    #[error("handshake not received within the allotted time")]
    HandshakeTimeout,

    #[error("too many undecodable messages ({0})")]
    TooManyDecodeErrors(u32),

    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    #[error("connection already registered: {0}")]
    DuplicateConnection(ConnectionId),

    #[error("connection closed: {0}")]
    ConnectionClosed(ConnectionId),
}

impl SignalError {
    /// Creates a protocol violation error.
    pub fn violation(
        phase: ConnectionPhase,
        message_type: MessageType,
        reason: impl Into<String>,
    ) -> Self {
        Self::ProtocolViolation {
            phase,
            message_type,
            reason: reason.into(),
        }
    }

    /// Code reported to the peer in an error notice, if one is sent at all.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Decode(_) | Self::Protocol(_) | Self::TooManyDecodeErrors(_) => {
                Some(ErrorCode::MalformedMessage)
            }
            Self::ProtocolViolation { .. } | Self::HandshakeTimeout => {
                Some(ErrorCode::ProtocolViolation)
            }
            Self::UnsupportedVersion(_) => Some(ErrorCode::UnsupportedVersion),
            Self::AuthenticationFailed(_) => Some(ErrorCode::AuthenticationFailed),
            Self::Unroutable(Unroutable::SenderNotInScope { .. }) => Some(ErrorCode::NotInScope),
            Self::Unroutable(_)
            | Self::UnknownConnection(_)
            | Self::DuplicateConnection(_)
            | Self::ConnectionClosed(_) => None,
        }
    }

    /// Returns true if this error ends the connection.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Decode(_) | Self::Protocol(_) | Self::Unroutable(_)
        )
    }
}
