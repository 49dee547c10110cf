//! Connection identity and scope membership.
//!
//! Connections are numbered by the transport that owns the socket; the
//! signaling core only ever compares and hashes them. Scope membership is
//! resolved once per connection at handshake time by the session store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for one live transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw transport-assigned identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ConnectionId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The session and match instances a profile currently belongs to.
///
/// Either may be absent: a peer can sit in a match lobby before any pairwise
/// session has been negotiated, or hold a session outside any match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeMembership {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    match_id: Option<String>,
}

impl ScopeMembership {
    /// Membership in no scope at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builder: set the session instance.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Builder: set the match instance.
    pub fn with_match(mut self, match_id: impl Into<String>) -> Self {
        self.match_id = Some(match_id.into());
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn match_id(&self) -> Option<&str> {
        self.match_id.as_deref()
    }

    /// Returns true if the profile belongs to neither a session nor a match.
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none() && self.match_id.is_none()
    }
}
