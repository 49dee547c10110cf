//! Server-originated notices.

use serde::{Deserialize, Serialize};

use crate::kind::{MessageType, SignalLifecycle};
use crate::message::Message;

/// Tells a sender that its direct signal reached nobody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientUnavailable {
    recipient_profile_id: String,
    lifecycle: SignalLifecycle,
    /// Type of the signal that was dropped.
    signal_type: MessageType,
}

impl RecipientUnavailable {
    pub fn new(
        recipient_profile_id: impl Into<String>,
        lifecycle: SignalLifecycle,
        signal_type: MessageType,
    ) -> Self {
        Self {
            recipient_profile_id: recipient_profile_id.into(),
            lifecycle,
            signal_type,
        }
    }

    pub fn recipient_profile_id(&self) -> &str {
        &self.recipient_profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }

    pub fn signal_type(&self) -> MessageType {
        self.signal_type
    }
}

impl Message for RecipientUnavailable {
    const MESSAGE_TYPE: MessageType = MessageType::RecipientUnavailable;
}

/// Error codes carried by [`ErrorNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The message could not be decoded.
    MalformedMessage,
    /// The message is not allowed in the connection's current state.
    ProtocolViolation,
    /// The handshake named a version the server does not speak.
    UnsupportedVersion,
    /// The session store refused the profile id / session key pair.
    AuthenticationFailed,
    /// The sender is not a member of the scope its signal targets.
    NotInScope,
}

impl ErrorCode {
    /// Returns a human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MalformedMessage => "The message could not be decoded",
            Self::ProtocolViolation => "The message is not allowed in this connection state",
            Self::UnsupportedVersion => "The requested protocol version is not supported",
            Self::AuthenticationFailed => "Authentication failed",
            Self::NotInScope => "The sender is not a member of the target scope",
        }
    }
}

/// Error notice sent to a client before a message is dropped or the
/// connection is closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorNotice {
    code: ErrorCode,
    message: String,
}

impl ErrorNotice {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Message for ErrorNotice {
    const MESSAGE_TYPE: MessageType = MessageType::Error;
}

impl std::fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serializes_symbolically() {
        let json = serde_json::to_string(&ErrorCode::NotInScope).unwrap();
        assert_eq!(json, r#""NOT_IN_SCOPE""#);
    }

    #[test]
    fn error_notice_display() {
        let notice = ErrorNotice::new(ErrorCode::MalformedMessage, "expected value at line 1");
        let display = notice.to_string();
        assert!(display.contains("could not be decoded"));
        assert!(display.contains("line 1"));
    }

    #[test]
    fn recipient_unavailable_fields() {
        let notice =
            RecipientUnavailable::new("p2", SignalLifecycle::Session, MessageType::SdpAnswer);
        assert_eq!(notice.recipient_profile_id(), "p2");
        assert_eq!(notice.lifecycle(), SignalLifecycle::Session);
        assert_eq!(notice.signal_type(), MessageType::SdpAnswer);
    }
}
