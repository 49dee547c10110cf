//! Session validation.

use std::collections::HashMap;

use crossfire_core::ScopeMembership;

/// Validates handshakes against the session store and resolves which scopes
/// a profile belongs to.
pub trait Authenticator: Send + Sync {
    /// Returns true if `session_key` is a live session for `profile_id`.
    fn validate(&self, profile_id: &str, session_key: &str) -> bool;

    /// Scope instances the profile is a member of at handshake time.
    fn scope_membership(&self, profile_id: &str) -> ScopeMembership;
}

#[derive(Debug, Clone)]
struct Credentials {
    session_key: String,
    membership: ScopeMembership,
}

/// Fixed, in-memory set of profiles.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    profiles: HashMap<String, Credentials>,
}

impl StaticAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a profile with its session key and memberships.
    pub fn with_profile(
        mut self,
        profile_id: impl Into<String>,
        session_key: impl Into<String>,
        membership: ScopeMembership,
    ) -> Self {
        self.profiles.insert(
            profile_id.into(),
            Credentials {
                session_key: session_key.into(),
                membership,
            },
        );
        self
    }
}

impl Authenticator for StaticAuthenticator {
    fn validate(&self, profile_id: &str, session_key: &str) -> bool {
        self.profiles
            .get(profile_id)
            .is_some_and(|c| c.session_key == session_key)
    }

    fn scope_membership(&self, profile_id: &str) -> ScopeMembership {
        self.profiles
            .get(profile_id)
            .map(|c| c.membership.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> StaticAuthenticator {
        StaticAuthenticator::new()
            .with_profile("p1", "k1", ScopeMembership::none().with_session("s1"))
            .with_profile(
                "p2",
                "k2",
                ScopeMembership::none().with_session("s1").with_match("m1"),
            )
    }

    #[test]
    fn validates_known_key() {
        let auth = authenticator();
        assert!(auth.validate("p2", "k2"));
        assert!(auth.validate("p1", "k1"));
        assert!(!auth.validate("p1", "k2"));
        assert!(!auth.validate("p3", "k1"));
    }

    #[test]
    fn membership_lookup() {
        let auth = authenticator();
        let membership = auth.scope_membership("p2");
        assert_eq!(membership.session_id(), Some("s1"));
        assert_eq!(membership.match_id(), Some("m1"));
        assert!(auth.scope_membership("nobody").is_empty());
    }
}
