//! Signaling relay: handshake state machine, scope registry, signal router.
//!
//! This crate drives Crossfire connections on behalf of a transport:
//! - Handshake gating and version negotiation per connection
//! - Scope membership for sessions and matches
//! - Direct and broadcast routing of signals between peers
//! - Error notices and teardown on protocol violations
//!
//! Sockets stay outside. A transport implements [`Transport`] and feeds
//! [`SignalHandler`] with `on_open`, `on_receive` and `on_close`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use crossfire_core::{ConnectionId, ScopeMembership};
//! use crossfire_server::{ChannelTransport, ServerConfig, SignalHandler, StaticAuthenticator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(ChannelTransport::new());
//! let auth = StaticAuthenticator::new()
//!     .with_profile("p1", "key", ScopeMembership::none().with_session("s1"));
//! let handler = SignalHandler::shared(ServerConfig::default(), transport.clone(), Arc::new(auth));
//!
//! let id = ConnectionId::new(1);
//! let mut outbound = transport.register(id);
//! handler.on_open(id).await?;
//! handler.arm_handshake_timeout(id);
//!
//! let dispatch = handler
//!     .on_receive(id, br#"{"version":"V_1_0","profileId":"p1","sessionKey":"key"}"#)
//!     .await;
//! println!("{}", dispatch.label());
//! # let _ = outbound.try_recv();
//! # Ok(())
//! # }
//! ```

mod auth;
mod config;
mod error;
mod handler;
mod registry;
mod router;
mod session;
mod transport;

pub use auth::{Authenticator, StaticAuthenticator};
pub use config::ServerConfig;
pub use error::{SignalError, SignalResult};
pub use handler::{Dispatch, SharedHandler, SignalHandler};
pub use registry::{ScopeKey, ScopeRegistry};
pub use router::{RouteOutcome, Sender, SignalRouter, Unroutable};
pub use session::{ConnectionPhase, Peer, PeerConnection};
pub use transport::{ChannelTransport, Outbound, Transport};
