//! Message model and wire codec for the Crossfire signaling protocol.
//!
//! Crossfire carries WebRTC session negotiation (SDP offers and answers, ICE
//! candidates) and presence events (join, leave, disconnect) between peers
//! through a relay server.
//!
//! # Protocol Overview
//!
//! Each message is one JSON object. A connection starts with a
//! [`HandshakeRequest`] naming the protocol version; only after the server
//! accepts it may [`Signal`]s flow. Every signal is scoped by a
//! [`SignalLifecycle`]:
//! - `SESSION`: a pairwise session between two peers
//! - `MATCH`: a multi-party match
//!
//! Direct signals name one recipient; broadcast signals reach every peer in
//! the sender's scope. [`MessageType::delivery`] is the authoritative table.
//!
//! # Example
//!
//! ```rust
//! use crossfire_protocol::{decode, encode, ProtocolMessage, SdpAnswerDirectSignal};
//!
//! let answer = ProtocolMessage::from(SdpAnswerDirectSignal::new("p1", "p2", "v=0"));
//! let bytes = encode(&answer).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), answer);
//! ```

mod codec;
mod error;
mod handshake;
mod kind;
mod message;
mod notice;
mod signal;

pub use codec::{
    DISCRIMINATOR, LEGACY_DISCRIMINATOR, decode, decode_with_limit, encode, encode_record,
    encode_signal,
};
pub use error::{DecodeError, ProtocolError, ProtocolResult};
pub use handshake::{HandshakeOutcome, HandshakeRequest, HandshakeResponse};
pub use kind::{Delivery, MessageType, ProtocolVersion, SenderPolicy, SignalLifecycle};
pub use message::{Message, ProtocolMessage};
pub use notice::{ErrorCode, ErrorNotice, RecipientUnavailable};
pub use signal::{
    BroadcastSignal, DirectSignal, DisconnectBroadcastSignal, IceCandidateDirectSignal,
    JoinBroadcastSignal, LeaveBroadcastSignal, SdpAnswerDirectSignal, SdpOfferDirectSignal,
    Signal,
};

/// Maximum message size (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
