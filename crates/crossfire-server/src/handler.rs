//! Inbound message dispatch.
//!
//! [`SignalHandler`] is the seam between a transport and the signaling core.
//! The transport reports opened connections, raw inbound payloads and
//! closures; the handler decodes, drives each connection's state machine,
//! routes signals and writes replies back through the [`Transport`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

use crossfire_core::ConnectionId;
use crossfire_protocol::{
    DecodeError, DisconnectBroadcastSignal, ErrorNotice, HandshakeRequest, HandshakeResponse,
    MessageType, ProtocolMessage, ProtocolVersion, RecipientUnavailable, Signal, SignalLifecycle,
    decode_with_limit, encode, encode_signal,
};

use crate::auth::Authenticator;
use crate::config::ServerConfig;
use crate::error::{SignalError, SignalResult};
use crate::registry::{ScopeKey, ScopeRegistry};
use crate::router::{RouteOutcome, Sender, SignalRouter, Unroutable};
use crate::session::{ConnectionPhase, PeerConnection};
use crate::transport::Transport;

/// What the handler did with one inbound payload.
#[derive(Debug)]
pub enum Dispatch {
    /// Handshake accepted; the connection is now established.
    Established {
        profile_id: String,
        version: ProtocolVersion,
    },
    /// Signal relayed to `recipients`.
    Delivered {
        message_type: MessageType,
        recipients: Vec<ConnectionId>,
    },
    /// Valid signal that reached nobody. The sender has been told.
    Unroutable {
        message_type: MessageType,
        reason: Unroutable,
    },
    /// `DISCONNECT` relayed to `recipients`, then the connection was closed.
    Disconnected { recipients: Vec<ConnectionId> },
    /// Message dropped; the connection stays open.
    Dropped(SignalError),
    /// The connection was closed because of the error.
    Closed(SignalError),
    /// Nothing was done: the connection is unknown or already closed.
    Rejected(SignalError),
}

impl Dispatch {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Established { .. } => "established",
            Self::Delivered { .. } => "delivered",
            Self::Unroutable { .. } => "unroutable",
            Self::Disconnected { .. } => "disconnected",
            Self::Dropped(_) => "dropped",
            Self::Closed(_) => "closed",
            Self::Rejected(_) => "rejected",
        }
    }
}

type SharedConnection = Arc<Mutex<PeerConnection>>;

/// Shared handler, as held by transport tasks and timers.
pub type SharedHandler = Arc<SignalHandler>;

/// Drives every connection through handshake, routing and teardown.
///
/// Each connection is processed by one task at a time; different
/// connections are handled concurrently.
pub struct SignalHandler {
    config: ServerConfig,
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    router: SignalRouter,
    connections: RwLock<HashMap<ConnectionId, SharedConnection>>,
}

impl SignalHandler {
    pub fn new(
        config: ServerConfig,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            config,
            transport,
            authenticator,
            router: SignalRouter::new(Arc::new(ScopeRegistry::new())),
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a handler ready to be shared across tasks.
    pub fn shared(
        config: ServerConfig,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
    ) -> SharedHandler {
        Arc::new(Self::new(config, transport, authenticator))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ScopeRegistry> {
        self.router.registry()
    }

    /// Number of connections the transport has not yet reported closed.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Current phase of a connection.
    pub async fn phase(&self, connection_id: ConnectionId) -> Option<ConnectionPhase> {
        let conn = self.connection(connection_id).await?;
        let phase = conn.lock().await.phase();
        Some(phase)
    }

    /// Registers a newly accepted connection, awaiting its handshake.
    #[tracing::instrument(skip(self))]
    pub async fn on_open(&self, connection_id: ConnectionId) -> SignalResult<()> {
        let mut connections = self.connections.write().await;
        if connections.contains_key(&connection_id) {
            return Err(SignalError::DuplicateConnection(connection_id));
        }
        connections.insert(
            connection_id,
            Arc::new(Mutex::new(PeerConnection::new(connection_id))),
        );
        debug!("Connection opened");
        Ok(())
    }

    /// Handles one inbound payload.
    #[tracing::instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn on_receive(&self, connection_id: ConnectionId, data: &[u8]) -> Dispatch {
        let Some(conn) = self.connection(connection_id).await else {
            warn!("Payload for unknown connection");
            return Dispatch::Rejected(SignalError::UnknownConnection(connection_id));
        };

        let start = Instant::now();
        let mut conn = conn.lock().await;
        let span = conn.span().clone();
        let dispatch = self.dispatch(&mut conn, data).instrument(span).await;

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                outcome = dispatch.label(),
                duration_us = start.elapsed().as_micros() as u64,
                "Payload handled"
            );
        }
        dispatch
    }

    /// Handles the transport reporting a connection gone.
    ///
    /// An established peer is removed from its scopes and a `DISCONNECT` is
    /// broadcast on its behalf. Returns false for an unknown connection.
    #[tracing::instrument(skip(self))]
    pub async fn on_close(&self, connection_id: ConnectionId) -> bool {
        let Some(conn) = self.connections.write().await.remove(&connection_id) else {
            debug!("Close for unknown connection");
            return false;
        };

        let mut conn = conn.lock().await;
        if conn.phase() != ConnectionPhase::Closed {
            let span = conn.span().clone();
            self.close_connection(&mut conn, None).instrument(span).await;
        }
        true
    }

    /// Closes the connection if it has not completed its handshake within
    /// the configured timeout. The task resolves to true if it closed it.
    pub fn arm_handshake_timeout(self: &Arc<Self>, connection_id: ConnectionId) -> JoinHandle<bool> {
        let handler = Arc::clone(self);
        let timeout = self.config.handshake_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            handler.expire_handshake(connection_id).await
        })
    }

    async fn expire_handshake(&self, connection_id: ConnectionId) -> bool {
        let Some(conn) = self.connection(connection_id).await else {
            return false;
        };
        let mut conn = conn.lock().await;
        if conn.phase() != ConnectionPhase::AwaitingHandshake {
            return false;
        }

        let span = conn.span().clone();
        warn!(parent: &span, timeout = ?self.config.handshake_timeout, "Handshake timed out");
        self.fail(&mut conn, SignalError::HandshakeTimeout)
            .instrument(span)
            .await;
        true
    }

    async fn connection(&self, connection_id: ConnectionId) -> Option<SharedConnection> {
        self.connections.read().await.get(&connection_id).cloned()
    }

    async fn dispatch(&self, conn: &mut PeerConnection, data: &[u8]) -> Dispatch {
        if conn.phase() == ConnectionPhase::Closed {
            return Dispatch::Rejected(SignalError::ConnectionClosed(conn.id()));
        }

        let message = match decode_with_limit(data, self.config.max_message_size) {
            Ok(message) => message,
            Err(e) => return self.reject_undecodable(conn, e).await,
        };
        conn.reset_decode_failures();

        if let Err(e) = conn.check_inbound(message.message_type()) {
            return self.fail(conn, e).await;
        }

        match message {
            ProtocolMessage::HandshakeRequest(request) => self.handshake(conn, request).await,
            ProtocolMessage::Signal(signal) => self.relay(conn, signal).await,
            other => {
                let error = SignalError::violation(
                    conn.phase(),
                    other.message_type(),
                    "message type is sent by the server only",
                );
                self.fail(conn, error).await
            }
        }
    }

    async fn reject_undecodable(&self, conn: &mut PeerConnection, error: DecodeError) -> Dispatch {
        let error = SignalError::Decode(error);
        if conn.phase() == ConnectionPhase::AwaitingHandshake {
            return self.fail(conn, error).await;
        }

        let failures = conn.record_decode_failure();
        if failures >= self.config.max_decode_errors {
            warn!(%error, failures, "Too many undecodable messages");
            return self
                .fail(conn, SignalError::TooManyDecodeErrors(failures))
                .await;
        }

        debug!(%error, failures, "Dropping undecodable message");
        if self.config.notify_decode_errors {
            self.notify_error(conn.id(), &error);
        }
        Dispatch::Dropped(error)
    }

    async fn handshake(&self, conn: &mut PeerConnection, request: HandshakeRequest) -> Dispatch {
        let version = match conn.check_handshake(&request, &self.config) {
            Ok(version) => version,
            Err(e) => return self.fail(conn, e).await,
        };

        let profile_id = request.profile_id().to_string();
        if !self
            .authenticator
            .validate(&profile_id, request.session_key())
        {
            return self
                .fail(conn, SignalError::AuthenticationFailed(profile_id))
                .await;
        }

        let membership = self.authenticator.scope_membership(&profile_id);
        let scopes = ScopeKey::all_for(&membership);
        if let Err(e) = conn.establish(profile_id.clone(), version, membership) {
            return self.fail(conn, e).await;
        }

        for key in &scopes {
            if let Some(previous) = self.registry().join(key, &profile_id, conn.id()).await {
                warn!(scope = %key, %previous, "Profile rebound to a new connection");
            }
        }

        info!(%version, scopes = scopes.len(), "Handshake accepted");
        self.send(conn.id(), HandshakeResponse::accepted(version));
        Dispatch::Established {
            profile_id,
            version,
        }
    }

    async fn relay(&self, conn: &mut PeerConnection, signal: Signal) -> Dispatch {
        let sender = match conn.sender_for(&signal) {
            Ok(sender) => sender,
            Err(e) => return self.fail(conn, e).await,
        };
        let message_type = signal.message_type();
        let scope = ScopeKey::for_membership(signal.lifecycle(), &sender.membership);

        // Relayed bytes are re-encoded and may outgrow the size limit.
        let payload = match encode_signal(&signal) {
            Ok(payload) => payload,
            Err(e) => {
                let error = SignalError::Protocol(e);
                warn!(%error, %message_type, "Dropping signal that cannot be relayed");
                self.notify_error(sender.connection_id, &error);
                return Dispatch::Dropped(error);
            }
        };

        if message_type == MessageType::SignalJoin
            && let Some(key) = &scope
            && !self
                .registry()
                .claim(key, &sender.profile_id, sender.connection_id)
                .await
        {
            warn!(scope = %key, "Join from a connection superseded by a newer handshake");
            let reason = Unroutable::SenderNotInScope {
                lifecycle: key.lifecycle(),
            };
            self.notify_unroutable(&signal, &sender, &reason);
            return Dispatch::Unroutable {
                message_type,
                reason,
            };
        }

        let outcome = self.router.route(&signal, &sender).await;
        match &outcome {
            RouteOutcome::Deliver(recipients) => self.deliver(&payload, recipients),
            RouteOutcome::Unroutable(reason) => self.notify_unroutable(&signal, &sender, reason),
        }

        match message_type {
            MessageType::SignalLeave => {
                if let Some(key) = &scope {
                    self.registry()
                        .leave(key, &sender.profile_id, sender.connection_id)
                        .await;
                }
            }
            MessageType::Disconnect => {
                self.close_connection(conn, Some(signal.lifecycle())).await;
                return Dispatch::Disconnected {
                    recipients: outcome.targets().to_vec(),
                };
            }
            _ => {}
        }

        match outcome {
            RouteOutcome::Deliver(recipients) => Dispatch::Delivered {
                message_type,
                recipients,
            },
            RouteOutcome::Unroutable(reason) => Dispatch::Unroutable {
                message_type,
                reason,
            },
        }
    }

    /// Reports `error` to the peer and closes the connection.
    ///
    /// Before the handshake completes the report is a rejected
    /// `HandshakeResponse`; afterwards it is an error notice.
    async fn fail(&self, conn: &mut PeerConnection, error: SignalError) -> Dispatch {
        warn!(%error, phase = %conn.phase(), "Closing connection");
        match conn.phase() {
            ConnectionPhase::AwaitingHandshake => {
                self.send(conn.id(), HandshakeResponse::rejected(error.to_string()));
            }
            ConnectionPhase::Established => self.notify_error(conn.id(), &error),
            ConnectionPhase::Closed => {}
        }
        self.close_connection(conn, None).await;
        Dispatch::Closed(error)
    }

    /// `-> Closed`. Leaves every scope, announcing the departure in each one
    /// except `announced`, and asks the transport to drop the connection.
    async fn close_connection(
        &self,
        conn: &mut PeerConnection,
        announced: Option<SignalLifecycle>,
    ) {
        let connection_id = conn.id();
        let Some(peer) = conn.close() else {
            debug!("Connection closed before handshake");
            self.transport.close(connection_id);
            return;
        };

        let sender = Sender {
            connection_id,
            profile_id: peer.profile_id.clone(),
            membership: peer.membership.clone(),
        };
        for key in ScopeKey::all_for(&peer.membership) {
            if announced != Some(key.lifecycle()) {
                let signal = Signal::from(DisconnectBroadcastSignal::new(
                    peer.profile_id.clone(),
                    key.lifecycle(),
                ));
                if let RouteOutcome::Deliver(recipients) = self.router.route(&signal, &sender).await
                {
                    match encode_signal(&signal) {
                        Ok(payload) => self.deliver(&payload, &recipients),
                        Err(e) => error!(error = %e, scope = %key, "Failed to encode disconnect"),
                    }
                }
            }
            self.registry()
                .leave(&key, &peer.profile_id, connection_id)
                .await;
        }

        info!("Connection closed");
        self.transport.close(connection_id);
    }

    fn deliver(&self, payload: &[u8], recipients: &[ConnectionId]) {
        for recipient in recipients {
            self.transport.send(*recipient, payload.to_vec());
        }
    }

    fn notify_unroutable(&self, signal: &Signal, sender: &Sender, reason: &Unroutable) {
        match reason {
            Unroutable::RecipientNotInScope {
                recipient_profile_id,
                lifecycle,
            } => self.send(
                sender.connection_id,
                RecipientUnavailable::new(
                    recipient_profile_id.clone(),
                    *lifecycle,
                    signal.message_type(),
                ),
            ),
            other => self.notify_error(sender.connection_id, &SignalError::Unroutable(other.clone())),
        }
    }

    fn notify_error(&self, connection_id: ConnectionId, error: &SignalError) {
        if let Some(code) = error.error_code() {
            self.send(connection_id, ErrorNotice::new(code, error.to_string()));
        }
    }

    fn send(&self, connection_id: ConnectionId, message: impl Into<ProtocolMessage>) {
        let message: ProtocolMessage = message.into();
        match encode(&message) {
            Ok(payload) => self.transport.send(connection_id, payload),
            Err(e) => error!(
                error = %e,
                message_type = %message.message_type(),
                "Failed to encode message"
            ),
        }
    }
}
