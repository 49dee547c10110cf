//! The closed set of Crossfire protocol messages.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::{DecodeError, ProtocolResult};
use crate::handshake::{HandshakeRequest, HandshakeResponse};
use crate::kind::MessageType;
use crate::notice::{ErrorNotice, RecipientUnavailable};
use crate::signal::Signal;

/// Contract shared by every concrete message record.
///
/// The tag is an associated constant: a record cannot carry a different
/// `messageType` than the one its type declares.
pub trait Message: Serialize + DeserializeOwned + Into<ProtocolMessage> {
    /// Discriminator written to and expected on the wire.
    const MESSAGE_TYPE: MessageType;

    /// Whether the discriminator is written when encoding. The handshake
    /// request predates the discriminator and is sent without one.
    const TAGGED: bool = true;

    fn message_type(&self) -> MessageType {
        Self::MESSAGE_TYPE
    }

    /// Checks invariants serde cannot express (non-empty ids and the like).
    fn validate(&self) -> Result<(), DecodeError> {
        Ok(())
    }

    /// Encodes this record on its own.
    fn encode(&self) -> ProtocolResult<Vec<u8>> {
        codec::encode_record(self)
    }
}

/// Any message that can cross the wire, keyed by [`MessageType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    HandshakeRequest(HandshakeRequest),
    HandshakeResponse(HandshakeResponse),
    Signal(Signal),
    RecipientUnavailable(RecipientUnavailable),
    Error(ErrorNotice),
}

impl ProtocolMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::HandshakeRequest(m) => m.message_type(),
            Self::HandshakeResponse(m) => m.message_type(),
            Self::Signal(signal) => signal.message_type(),
            Self::RecipientUnavailable(m) => m.message_type(),
            Self::Error(m) => m.message_type(),
        }
    }

    /// Returns the signal if this message is one.
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Self::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        codec::encode(self)
    }
}

impl From<HandshakeRequest> for ProtocolMessage {
    fn from(message: HandshakeRequest) -> Self {
        Self::HandshakeRequest(message)
    }
}

impl From<HandshakeResponse> for ProtocolMessage {
    fn from(message: HandshakeResponse) -> Self {
        Self::HandshakeResponse(message)
    }
}

impl From<Signal> for ProtocolMessage {
    fn from(signal: Signal) -> Self {
        Self::Signal(signal)
    }
}

impl From<RecipientUnavailable> for ProtocolMessage {
    fn from(message: RecipientUnavailable) -> Self {
        Self::RecipientUnavailable(message)
    }
}

impl From<ErrorNotice> for ProtocolMessage {
    fn from(message: ErrorNotice) -> Self {
        Self::Error(message)
    }
}
