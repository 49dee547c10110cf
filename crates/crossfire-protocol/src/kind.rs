//! Enumerations shared by every Crossfire message.
//!
//! All of these travel on the wire as their symbolic names, never as
//! ordinals, so peers built against different enum orderings still agree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Tag identifying the shape of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Client → server, first message on every connection.
    Handshake,
    /// Server → client reply to the handshake.
    HandshakeResponse,
    SdpOffer,
    SdpAnswer,
    IceCandidate,
    #[serde(alias = "JOIN")]
    SignalJoin,
    #[serde(alias = "LEAVE")]
    SignalLeave,
    Disconnect,
    /// Server → client notice that a direct signal could not be delivered.
    RecipientUnavailable,
    /// Server → client error notice.
    Error,
}

impl MessageType {
    /// Every message type, in declaration order.
    pub const ALL: [MessageType; 10] = [
        Self::Handshake,
        Self::HandshakeResponse,
        Self::SdpOffer,
        Self::SdpAnswer,
        Self::IceCandidate,
        Self::SignalJoin,
        Self::SignalLeave,
        Self::Disconnect,
        Self::RecipientUnavailable,
        Self::Error,
    ];

    /// Returns the canonical wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Handshake => "HANDSHAKE",
            Self::HandshakeResponse => "HANDSHAKE_RESPONSE",
            Self::SdpOffer => "SDP_OFFER",
            Self::SdpAnswer => "SDP_ANSWER",
            Self::IceCandidate => "ICE_CANDIDATE",
            Self::SignalJoin => "SIGNAL_JOIN",
            Self::SignalLeave => "SIGNAL_LEAVE",
            Self::Disconnect => "DISCONNECT",
            Self::RecipientUnavailable => "RECIPIENT_UNAVAILABLE",
            Self::Error => "ERROR",
        }
    }

    /// How the router delivers messages of this type.
    ///
    /// The table is total: adding a variant without deciding its delivery
    /// is a compile error.
    pub fn delivery(&self) -> Delivery {
        match self {
            Self::SdpOffer | Self::SdpAnswer | Self::IceCandidate => Delivery::Direct,
            Self::SignalJoin => Delivery::Broadcast(SenderPolicy::Include),
            Self::SignalLeave | Self::Disconnect => Delivery::Broadcast(SenderPolicy::Exclude),
            Self::Handshake
            | Self::HandshakeResponse
            | Self::RecipientUnavailable
            | Self::Error => Delivery::ServerOnly,
        }
    }

    /// Returns true for types a client may send once established.
    pub fn is_signal(&self) -> bool {
        !matches!(self.delivery(), Delivery::ServerOnly)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JOIN" => return Ok(Self::SignalJoin),
            "LEAVE" => return Ok(Self::SignalLeave),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownMessageType(s.to_string()))
    }
}

/// Delivery rule attached to each [`MessageType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Delivered to the single named recipient.
    Direct,
    /// Fanned out to every member of the sender's scope.
    Broadcast(SenderPolicy),
    /// Originates at the server; never routed between peers.
    ServerOnly,
}

/// Whether a broadcast is echoed back to its sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderPolicy {
    Include,
    Exclude,
}

/// Scope granularity a signal applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalLifecycle {
    /// Pairwise session between two peers.
    Session,
    /// Multi-party match.
    Match,
}

impl SignalLifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "SESSION",
            Self::Match => "MATCH",
        }
    }

    pub(crate) fn session() -> Self {
        Self::Session
    }

    pub(crate) fn match_scope() -> Self {
        Self::Match
    }
}

impl fmt::Display for SignalLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol versions this implementation speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "V_1_0")]
    V1_0,
}

impl ProtocolVersion {
    /// The newest version, offered by clients by default.
    pub const CURRENT: ProtocolVersion = ProtocolVersion::V1_0;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1_0 => "V_1_0",
        }
    }

    /// Parses a version token, returning `None` for anything unrecognized.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "V_1_0" => Some(Self::V1_0),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_serializes_symbolically() {
        for kind in MessageType::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert!(!json.trim_matches('"').chars().all(|c| c.is_ascii_digit()));

            let parsed: MessageType = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, kind);
            assert_eq!(kind.as_str().parse::<MessageType>().unwrap(), kind);
        }
    }

    #[test]
    fn message_type_accepts_short_aliases() {
        assert_eq!("JOIN".parse::<MessageType>().unwrap(), MessageType::SignalJoin);
        assert_eq!("LEAVE".parse::<MessageType>().unwrap(), MessageType::SignalLeave);

        let parsed: MessageType = serde_json::from_str("\"JOIN\"").unwrap();
        assert_eq!(parsed, MessageType::SignalJoin);
    }

    #[test]
    fn message_type_rejects_unknown_names() {
        let result = "SDP_PRANSWER".parse::<MessageType>();
        assert!(matches!(result, Err(DecodeError::UnknownMessageType(name)) if name == "SDP_PRANSWER"));
        assert!("sdp_offer".parse::<MessageType>().is_err());
    }

    #[test]
    fn delivery_table() {
        use Delivery::*;
        use SenderPolicy::*;

        assert_eq!(MessageType::SdpOffer.delivery(), Direct);
        assert_eq!(MessageType::SdpAnswer.delivery(), Direct);
        assert_eq!(MessageType::IceCandidate.delivery(), Direct);
        assert_eq!(MessageType::SignalJoin.delivery(), Broadcast(Include));
        assert_eq!(MessageType::SignalLeave.delivery(), Broadcast(Exclude));
        assert_eq!(MessageType::Disconnect.delivery(), Broadcast(Exclude));
        assert_eq!(MessageType::Handshake.delivery(), ServerOnly);
        assert_eq!(MessageType::HandshakeResponse.delivery(), ServerOnly);
        assert_eq!(MessageType::RecipientUnavailable.delivery(), ServerOnly);
        assert_eq!(MessageType::Error.delivery(), ServerOnly);
    }

    #[test]
    fn lifecycle_serializes_symbolically() {
        assert_eq!(
            serde_json::to_string(&SignalLifecycle::Session).unwrap(),
            r#""SESSION""#
        );
        assert_eq!(
            serde_json::to_string(&SignalLifecycle::Match).unwrap(),
            r#""MATCH""#
        );
        assert!(serde_json::from_str::<SignalLifecycle>("0").is_err());
    }

    #[test]
    fn protocol_version_tokens() {
        assert_eq!(ProtocolVersion::parse("V_1_0"), Some(ProtocolVersion::V1_0));
        assert_eq!(ProtocolVersion::parse("V_2_0"), None);
        assert_eq!(ProtocolVersion::parse("v_1_0"), None);
        assert_eq!(
            serde_json::to_string(&ProtocolVersion::CURRENT).unwrap(),
            r#""V_1_0""#
        );
    }
}
