//! Handshake messages.
//!
//! The handshake request must be the first message on a connection. It puts
//! the socket into signaling mode for the requested protocol version.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::kind::{MessageType, ProtocolVersion};
use crate::message::Message;

/// Client request to enter signaling mode.
///
/// `version` is kept as the raw token so that an unsupported version still
/// decodes and can be rejected as such, rather than as malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeRequest {
    version: String,
    profile_id: String,
    session_key: String,
}

impl HandshakeRequest {
    /// Creates a request for a known protocol version.
    pub fn new(
        version: ProtocolVersion,
        profile_id: impl Into<String>,
        session_key: impl Into<String>,
    ) -> Self {
        Self::with_raw_version(version.as_str(), profile_id, session_key)
    }

    /// Creates a request carrying an arbitrary version token.
    pub fn with_raw_version(
        version: impl Into<String>,
        profile_id: impl Into<String>,
        session_key: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            profile_id: profile_id.into(),
            session_key: session_key.into(),
        }
    }

    /// The version token exactly as sent.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The requested version, if it is one this implementation knows.
    pub fn protocol_version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::parse(&self.version)
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }
}

impl Message for HandshakeRequest {
    const MESSAGE_TYPE: MessageType = MessageType::Handshake;
    const TAGGED: bool = false;

    fn validate(&self) -> Result<(), DecodeError> {
        if self.profile_id.is_empty() {
            return Err(DecodeError::EmptyField("profileId"));
        }
        Ok(())
    }
}

/// Outcome of a handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandshakeOutcome {
    Accepted,
    Rejected,
}

/// Server reply to a [`HandshakeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeResponse {
    outcome: HandshakeOutcome,
    /// Negotiated version, present when accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<ProtocolVersion>,
    /// Human-readable rejection reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl HandshakeResponse {
    pub fn accepted(version: ProtocolVersion) -> Self {
        Self {
            outcome: HandshakeOutcome::Accepted,
            version: Some(version),
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            outcome: HandshakeOutcome::Rejected,
            version: None,
            reason: Some(reason.into()),
        }
    }

    pub fn outcome(&self) -> HandshakeOutcome {
        self.outcome
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == HandshakeOutcome::Accepted
    }

    pub fn version(&self) -> Option<ProtocolVersion> {
        self.version
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl Message for HandshakeResponse {
    const MESSAGE_TYPE: MessageType = MessageType::HandshakeResponse;
}
