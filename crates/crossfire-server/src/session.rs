//! Per-connection handshake state machine.
//!
//! ```text
//! AwaitingHandshake --valid handshake--> Established --disconnect/close/violation--> Closed
//!         |                                                                        ^
//!         +------------- malformed, unsupported version, bad credentials ----------+
//! ```
//!
//! `Closed` is terminal. The machine only decides; sending responses and
//! touching the scope registry is left to the handler.

use std::fmt;

use tracing::{Span, field, info_span};

use crossfire_core::{ConnectionId, ScopeMembership};
use crossfire_protocol::{HandshakeRequest, MessageType, ProtocolVersion, Signal};

use crate::config::ServerConfig;
use crate::error::{SignalError, SignalResult};
use crate::router::Sender;

/// Coarse connection state, without the data each state carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    AwaitingHandshake,
    Established,
    Closed,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AwaitingHandshake => "awaiting handshake",
            Self::Established => "established",
            Self::Closed => "closed",
        })
    }
}

/// The identity bound to a connection by a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub profile_id: String,
    pub version: ProtocolVersion,
    pub membership: ScopeMembership,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    AwaitingHandshake,
    Established(Peer),
    Closed,
}

/// One connection's protocol state.
#[derive(Debug)]
pub struct PeerConnection {
    id: ConnectionId,
    state: State,
    decode_failures: u32,
    span: Span,
}

impl PeerConnection {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: State::AwaitingHandshake,
            decode_failures: 0,
            span: info_span!("connection", connection_id = %id, profile_id = field::Empty),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn phase(&self) -> ConnectionPhase {
        match self.state {
            State::AwaitingHandshake => ConnectionPhase::AwaitingHandshake,
            State::Established(_) => ConnectionPhase::Established,
            State::Closed => ConnectionPhase::Closed,
        }
    }

    /// The authenticated peer, once established.
    pub fn peer(&self) -> Option<&Peer> {
        match &self.state {
            State::Established(peer) => Some(peer),
            _ => None,
        }
    }

    /// Checks that a handshake may be accepted in the current state and
    /// resolves its version against the versions `config` supports.
    ///
    /// Credentials are checked separately; call [`establish`](Self::establish)
    /// once they pass.
    pub fn check_handshake(
        &self,
        request: &HandshakeRequest,
        config: &ServerConfig,
    ) -> SignalResult<ProtocolVersion> {
        match self.phase() {
            ConnectionPhase::AwaitingHandshake => {}
            ConnectionPhase::Established => {
                return Err(SignalError::violation(
                    ConnectionPhase::Established,
                    MessageType::Handshake,
                    "handshake already completed",
                ));
            }
            ConnectionPhase::Closed => return Err(SignalError::ConnectionClosed(self.id)),
        }

        request
            .protocol_version()
            .filter(|version| config.supports(*version))
            .ok_or_else(|| SignalError::UnsupportedVersion(request.version().to_string()))
    }

    /// `AwaitingHandshake -> Established`.
    pub fn establish(
        &mut self,
        profile_id: impl Into<String>,
        version: ProtocolVersion,
        membership: ScopeMembership,
    ) -> SignalResult<()> {
        match self.phase() {
            ConnectionPhase::AwaitingHandshake => {}
            ConnectionPhase::Established => {
                return Err(SignalError::violation(
                    ConnectionPhase::Established,
                    MessageType::Handshake,
                    "handshake already completed",
                ));
            }
            ConnectionPhase::Closed => return Err(SignalError::ConnectionClosed(self.id)),
        }

        let profile_id = profile_id.into();
        self.span.record("profile_id", profile_id.as_str());
        self.state = State::Established(Peer {
            profile_id,
            version,
            membership,
        });
        Ok(())
    }

    /// Checks that `message_type` may be received in the current state.
    ///
    /// Only a handshake is allowed before establishment, and only signals
    /// after it. Server-originated types are never accepted from a client.
    pub fn check_inbound(&self, message_type: MessageType) -> SignalResult<()> {
        let phase = self.phase();
        match (phase, message_type) {
            (ConnectionPhase::Closed, _) => Err(SignalError::ConnectionClosed(self.id)),
            (ConnectionPhase::AwaitingHandshake, MessageType::Handshake) => Ok(()),
            (ConnectionPhase::AwaitingHandshake, other) => Err(SignalError::violation(
                phase,
                other,
                "handshake required before any other message",
            )),
            (ConnectionPhase::Established, other) if other.is_signal() => Ok(()),
            (ConnectionPhase::Established, MessageType::Handshake) => Err(SignalError::violation(
                phase,
                MessageType::Handshake,
                "handshake already completed",
            )),
            (ConnectionPhase::Established, other) => Err(SignalError::violation(
                phase,
                other,
                "message type is sent by the server only",
            )),
        }
    }

    /// Resolves the sender of `signal`, which must be this connection's
    /// authenticated profile.
    pub fn sender_for(&self, signal: &Signal) -> SignalResult<Sender> {
        let peer = match &self.state {
            State::Established(peer) => peer,
            State::AwaitingHandshake => {
                return Err(SignalError::violation(
                    ConnectionPhase::AwaitingHandshake,
                    signal.message_type(),
                    "handshake required before any other message",
                ));
            }
            State::Closed => return Err(SignalError::ConnectionClosed(self.id)),
        };

        if signal.profile_id() != peer.profile_id {
            return Err(SignalError::violation(
                ConnectionPhase::Established,
                signal.message_type(),
                format!(
                    "profileId {} does not match authenticated profile {}",
                    signal.profile_id(),
                    peer.profile_id
                ),
            ));
        }

        Ok(Sender {
            connection_id: self.id,
            profile_id: peer.profile_id.clone(),
            membership: peer.membership.clone(),
        })
    }

    /// Moves to `Closed`, returning the peer if the connection was
    /// established. Closing twice is a no-op.
    pub fn close(&mut self) -> Option<Peer> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Established(peer) => Some(peer),
            State::AwaitingHandshake | State::Closed => None,
        }
    }

    /// Counts one undecodable message and returns the running total.
    pub fn record_decode_failure(&mut self) -> u32 {
        self.decode_failures = self.decode_failures.saturating_add(1);
        self.decode_failures
    }

    pub fn reset_decode_failures(&mut self) {
        self.decode_failures = 0;
    }

    pub fn decode_failures(&self) -> u32 {
        self.decode_failures
    }
}
