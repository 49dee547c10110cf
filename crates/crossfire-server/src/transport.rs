//! Outbound side of the socket layer.
//!
//! The signaling core never owns sockets. It hands encoded payloads to a
//! [`Transport`] and asks it to close connections; the transport in turn feeds
//! inbound bytes and closures back into the handler.

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crossfire_core::ConnectionId;

/// Delivery of encoded messages to connected peers.
///
/// Both calls are fire-and-forget. A transport that cannot reach the peer
/// drops the payload; the handler learns about dead peers via `on_close`.
pub trait Transport: Send + Sync {
    /// Queues an encoded message for a connection.
    fn send(&self, connection_id: ConnectionId, payload: Vec<u8>);

    /// Tears down a connection.
    fn close(&self, connection_id: ConnectionId);
}

/// An item on a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Payload(Vec<u8>),
    /// Server closed the connection. Nothing follows.
    Close,
}

/// In-process transport with one unbounded queue per connection.
///
/// A socket task would call [`ChannelTransport::register`] on accept and
/// drain the returned receiver into its writer.
#[derive(Debug, Default)]
pub struct ChannelTransport {
    peers: DashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the outbound queue for a connection, replacing any previous one.
    pub fn register(&self, connection_id: ConnectionId) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.peers.insert(connection_id, tx);
        rx
    }
}

impl Transport for ChannelTransport {
    fn send(&self, connection_id: ConnectionId, payload: Vec<u8>) {
        let Some(tx) = self.peers.get(&connection_id) else {
            debug!(%connection_id, "Dropping payload for unregistered connection");
            return;
        };
        if tx.send(Outbound::Payload(payload)).is_err() {
            debug!(%connection_id, "Outbound queue closed, dropping payload");
        }
    }

    fn close(&self, connection_id: ConnectionId) {
        if let Some((_, tx)) = self.peers.remove(&connection_id) {
            let _ = tx.send(Outbound::Close);
        }
    }
}
