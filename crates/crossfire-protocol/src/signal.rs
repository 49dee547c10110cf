//! Signals exchanged between peers once a connection is established.
//!
//! A signal is either *direct* (one named recipient) or *broadcast* (every
//! peer sharing the sender's scope). Each concrete record fixes its
//! [`MessageType`] at the type level and supplies a default
//! [`SignalLifecycle`] used when the field is absent on the wire.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::kind::{Delivery, MessageType, SignalLifecycle};
use crate::message::{Message, ProtocolMessage};

fn require_non_empty(field: &'static str, value: &str) -> Result<(), DecodeError> {
    if value.is_empty() {
        Err(DecodeError::EmptyField(field))
    } else {
        Ok(())
    }
}

fn validate_direct(profile_id: &str, recipient_profile_id: &str) -> Result<(), DecodeError> {
    require_non_empty("profileId", profile_id)?;
    require_non_empty("recipientProfileId", recipient_profile_id)?;
    if profile_id == recipient_profile_id {
        return Err(DecodeError::SelfAddressed(profile_id.to_string()));
    }
    Ok(())
}

/// SDP offer from `profile_id` to `recipient_profile_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdpOfferDirectSignal {
    profile_id: String,
    recipient_profile_id: String,
    #[serde(default = "SignalLifecycle::session")]
    lifecycle: SignalLifecycle,
    peer_sdp: String,
}

impl SdpOfferDirectSignal {
    pub fn new(
        profile_id: impl Into<String>,
        recipient_profile_id: impl Into<String>,
        peer_sdp: impl Into<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            recipient_profile_id: recipient_profile_id.into(),
            lifecycle: SignalLifecycle::Session,
            peer_sdp: peer_sdp.into(),
        }
    }

    /// Builder: override the default `SESSION` lifecycle.
    pub fn with_lifecycle(mut self, lifecycle: SignalLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn recipient_profile_id(&self) -> &str {
        &self.recipient_profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }

    pub fn peer_sdp(&self) -> &str {
        &self.peer_sdp
    }
}

impl Message for SdpOfferDirectSignal {
    const MESSAGE_TYPE: MessageType = MessageType::SdpOffer;

    fn validate(&self) -> Result<(), DecodeError> {
        validate_direct(&self.profile_id, &self.recipient_profile_id)
    }
}

/// SDP answer from `profile_id` back to the peer that made the offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdpAnswerDirectSignal {
    profile_id: String,
    recipient_profile_id: String,
    #[serde(default = "SignalLifecycle::session")]
    lifecycle: SignalLifecycle,
    peer_sdp: String,
}

impl SdpAnswerDirectSignal {
    pub fn new(
        profile_id: impl Into<String>,
        recipient_profile_id: impl Into<String>,
        peer_sdp: impl Into<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            recipient_profile_id: recipient_profile_id.into(),
            lifecycle: SignalLifecycle::Session,
            peer_sdp: peer_sdp.into(),
        }
    }

    /// Builder: override the default `SESSION` lifecycle.
    pub fn with_lifecycle(mut self, lifecycle: SignalLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn recipient_profile_id(&self) -> &str {
        &self.recipient_profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }

    pub fn peer_sdp(&self) -> &str {
        &self.peer_sdp
    }
}

impl Message for SdpAnswerDirectSignal {
    const MESSAGE_TYPE: MessageType = MessageType::SdpAnswer;

    fn validate(&self) -> Result<(), DecodeError> {
        validate_direct(&self.profile_id, &self.recipient_profile_id)
    }
}

/// A trickled ICE candidate.
///
/// `sdp_mid` and `sdp_m_line_index` mirror the optional members of a WebRTC
/// `RTCIceCandidateInit` and are omitted from the wire when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidateDirectSignal {
    profile_id: String,
    recipient_profile_id: String,
    #[serde(default = "SignalLifecycle::session")]
    lifecycle: SignalLifecycle,
    candidate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp_mid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sdp_m_line_index: Option<u16>,
}

impl IceCandidateDirectSignal {
    pub fn new(
        profile_id: impl Into<String>,
        recipient_profile_id: impl Into<String>,
        candidate: impl Into<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            recipient_profile_id: recipient_profile_id.into(),
            lifecycle: SignalLifecycle::Session,
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }

    /// Builder: override the default `SESSION` lifecycle.
    pub fn with_lifecycle(mut self, lifecycle: SignalLifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Builder: set the media stream identification tag.
    pub fn with_sdp_mid(mut self, sdp_mid: impl Into<String>) -> Self {
        self.sdp_mid = Some(sdp_mid.into());
        self
    }

    /// Builder: set the m-line index.
    pub fn with_sdp_m_line_index(mut self, index: u16) -> Self {
        self.sdp_m_line_index = Some(index);
        self
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn recipient_profile_id(&self) -> &str {
        &self.recipient_profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn sdp_mid(&self) -> Option<&str> {
        self.sdp_mid.as_deref()
    }

    pub fn sdp_m_line_index(&self) -> Option<u16> {
        self.sdp_m_line_index
    }
}

impl Message for IceCandidateDirectSignal {
    const MESSAGE_TYPE: MessageType = MessageType::IceCandidate;

    fn validate(&self) -> Result<(), DecodeError> {
        validate_direct(&self.profile_id, &self.recipient_profile_id)
    }
}

/// Announces that `profile_id` entered the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinBroadcastSignal {
    profile_id: String,
    #[serde(default = "SignalLifecycle::match_scope")]
    lifecycle: SignalLifecycle,
}

impl JoinBroadcastSignal {
    /// Creates a join for the default `MATCH` lifecycle.
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self::with_lifecycle(profile_id, SignalLifecycle::Match)
    }

    pub fn with_lifecycle(profile_id: impl Into<String>, lifecycle: SignalLifecycle) -> Self {
        Self {
            profile_id: profile_id.into(),
            lifecycle,
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }
}

impl Message for JoinBroadcastSignal {
    const MESSAGE_TYPE: MessageType = MessageType::SignalJoin;

    fn validate(&self) -> Result<(), DecodeError> {
        require_non_empty("profileId", &self.profile_id)
    }
}

/// Announces that `profile_id` left the scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBroadcastSignal {
    profile_id: String,
    #[serde(default = "SignalLifecycle::match_scope")]
    lifecycle: SignalLifecycle,
}

impl LeaveBroadcastSignal {
    /// Creates a leave for the default `MATCH` lifecycle.
    pub fn new(profile_id: impl Into<String>) -> Self {
        Self::with_lifecycle(profile_id, SignalLifecycle::Match)
    }

    pub fn with_lifecycle(profile_id: impl Into<String>, lifecycle: SignalLifecycle) -> Self {
        Self {
            profile_id: profile_id.into(),
            lifecycle,
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }
}

impl Message for LeaveBroadcastSignal {
    const MESSAGE_TYPE: MessageType = MessageType::SignalLeave;

    fn validate(&self) -> Result<(), DecodeError> {
        require_non_empty("profileId", &self.profile_id)
    }
}

/// Announces that `profile_id` dropped its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectBroadcastSignal {
    profile_id: String,
    #[serde(default = "SignalLifecycle::session")]
    lifecycle: SignalLifecycle,
}

impl DisconnectBroadcastSignal {
    pub fn new(profile_id: impl Into<String>, lifecycle: SignalLifecycle) -> Self {
        Self {
            profile_id: profile_id.into(),
            lifecycle,
        }
    }

    pub fn profile_id(&self) -> &str {
        &self.profile_id
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }
}

impl Message for DisconnectBroadcastSignal {
    const MESSAGE_TYPE: MessageType = MessageType::Disconnect;

    fn validate(&self) -> Result<(), DecodeError> {
        require_non_empty("profileId", &self.profile_id)
    }
}

/// A signal addressed to exactly one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectSignal {
    SdpOffer(SdpOfferDirectSignal),
    SdpAnswer(SdpAnswerDirectSignal),
    IceCandidate(IceCandidateDirectSignal),
}

impl DirectSignal {
    pub fn profile_id(&self) -> &str {
        match self {
            Self::SdpOffer(s) => s.profile_id(),
            Self::SdpAnswer(s) => s.profile_id(),
            Self::IceCandidate(s) => s.profile_id(),
        }
    }

    pub fn recipient_profile_id(&self) -> &str {
        match self {
            Self::SdpOffer(s) => s.recipient_profile_id(),
            Self::SdpAnswer(s) => s.recipient_profile_id(),
            Self::IceCandidate(s) => s.recipient_profile_id(),
        }
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        match self {
            Self::SdpOffer(s) => s.lifecycle(),
            Self::SdpAnswer(s) => s.lifecycle(),
            Self::IceCandidate(s) => s.lifecycle(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::SdpOffer(s) => s.message_type(),
            Self::SdpAnswer(s) => s.message_type(),
            Self::IceCandidate(s) => s.message_type(),
        }
    }
}

/// A signal fanned out to the sender's whole scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastSignal {
    Join(JoinBroadcastSignal),
    Leave(LeaveBroadcastSignal),
    Disconnect(DisconnectBroadcastSignal),
}

impl BroadcastSignal {
    pub fn profile_id(&self) -> &str {
        match self {
            Self::Join(s) => s.profile_id(),
            Self::Leave(s) => s.profile_id(),
            Self::Disconnect(s) => s.profile_id(),
        }
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        match self {
            Self::Join(s) => s.lifecycle(),
            Self::Leave(s) => s.lifecycle(),
            Self::Disconnect(s) => s.lifecycle(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Join(s) => s.message_type(),
            Self::Leave(s) => s.message_type(),
            Self::Disconnect(s) => s.message_type(),
        }
    }
}

/// Any peer-to-peer signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Direct(DirectSignal),
    Broadcast(BroadcastSignal),
}

impl Signal {
    /// Originating peer.
    pub fn profile_id(&self) -> &str {
        match self {
            Self::Direct(s) => s.profile_id(),
            Self::Broadcast(s) => s.profile_id(),
        }
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        match self {
            Self::Direct(s) => s.lifecycle(),
            Self::Broadcast(s) => s.lifecycle(),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Direct(s) => s.message_type(),
            Self::Broadcast(s) => s.message_type(),
        }
    }

    /// Named recipient, present only for direct signals.
    pub fn recipient_profile_id(&self) -> Option<&str> {
        match self {
            Self::Direct(s) => Some(s.recipient_profile_id()),
            Self::Broadcast(_) => None,
        }
    }

    pub fn delivery(&self) -> Delivery {
        self.message_type().delivery()
    }
}

impl From<DirectSignal> for Signal {
    fn from(signal: DirectSignal) -> Self {
        Self::Direct(signal)
    }
}

impl From<BroadcastSignal> for Signal {
    fn from(signal: BroadcastSignal) -> Self {
        Self::Broadcast(signal)
    }
}

impl From<SdpOfferDirectSignal> for Signal {
    fn from(signal: SdpOfferDirectSignal) -> Self {
        Self::Direct(DirectSignal::SdpOffer(signal))
    }
}

impl From<SdpAnswerDirectSignal> for Signal {
    fn from(signal: SdpAnswerDirectSignal) -> Self {
        Self::Direct(DirectSignal::SdpAnswer(signal))
    }
}

impl From<IceCandidateDirectSignal> for Signal {
    fn from(signal: IceCandidateDirectSignal) -> Self {
        Self::Direct(DirectSignal::IceCandidate(signal))
    }
}

impl From<JoinBroadcastSignal> for Signal {
    fn from(signal: JoinBroadcastSignal) -> Self {
        Self::Broadcast(BroadcastSignal::Join(signal))
    }
}

impl From<LeaveBroadcastSignal> for Signal {
    fn from(signal: LeaveBroadcastSignal) -> Self {
        Self::Broadcast(BroadcastSignal::Leave(signal))
    }
}

impl From<DisconnectBroadcastSignal> for Signal {
    fn from(signal: DisconnectBroadcastSignal) -> Self {
        Self::Broadcast(BroadcastSignal::Disconnect(signal))
    }
}

impl From<SdpOfferDirectSignal> for ProtocolMessage {
    fn from(signal: SdpOfferDirectSignal) -> Self {
        Self::Signal(signal.into())
    }
}

impl From<SdpAnswerDirectSignal> for ProtocolMessage {
    fn from(signal: SdpAnswerDirectSignal) -> Self {
        Self::Signal(signal.into())
    }
}

impl From<IceCandidateDirectSignal> for ProtocolMessage {
    fn from(signal: IceCandidateDirectSignal) -> Self {
        Self::Signal(signal.into())
    }
}

impl From<JoinBroadcastSignal> for ProtocolMessage {
    fn from(signal: JoinBroadcastSignal) -> Self {
        Self::Signal(signal.into())
    }
}

impl From<LeaveBroadcastSignal> for ProtocolMessage {
    fn from(signal: LeaveBroadcastSignal) -> Self {
        Self::Signal(signal.into())
    }
}

impl From<DisconnectBroadcastSignal> for ProtocolMessage {
    fn from(signal: DisconnectBroadcastSignal) -> Self {
        Self::Signal(signal.into())
    }
}
