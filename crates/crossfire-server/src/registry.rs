//! Scope membership registry.
//!
//! A scope is one instance of a [`SignalLifecycle`]: a particular session or
//! a particular match. Each scope maps the profile ids of its members to the
//! connection currently speaking for that profile.
//!
//! The outer map is behind a read-write lock that is taken for writing only to
//! create or drop a scope. Membership changes take the write lock of the one
//! scope they touch, so routing in other scopes is never blocked by them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crossfire_core::{ConnectionId, ScopeMembership};
use crossfire_protocol::SignalLifecycle;

/// Identifies one scope instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeKey {
    lifecycle: SignalLifecycle,
    instance_id: String,
}

impl ScopeKey {
    pub fn new(lifecycle: SignalLifecycle, instance_id: impl Into<String>) -> Self {
        Self {
            lifecycle,
            instance_id: instance_id.into(),
        }
    }

    /// Key of the scope `membership` holds for `lifecycle`, if any.
    pub fn for_membership(lifecycle: SignalLifecycle, membership: &ScopeMembership) -> Option<Self> {
        let instance_id = match lifecycle {
            SignalLifecycle::Session => membership.session_id(),
            SignalLifecycle::Match => membership.match_id(),
        }?;
        Some(Self::new(lifecycle, instance_id))
    }

    /// Every scope key held by `membership`.
    pub fn all_for(membership: &ScopeMembership) -> Vec<Self> {
        [SignalLifecycle::Session, SignalLifecycle::Match]
            .into_iter()
            .filter_map(|lifecycle| Self::for_membership(lifecycle, membership))
            .collect()
    }

    pub fn lifecycle(&self) -> SignalLifecycle {
        self.lifecycle
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lifecycle, self.instance_id)
    }
}

type Members = HashMap<String, ConnectionId>;

/// Registry of scope members, shared by the handler and the router.
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: RwLock<HashMap<ScopeKey, Arc<RwLock<Members>>>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `profile_id` to a scope, bound to `connection_id`.
    ///
    /// Returns the connection previously bound to that profile in the scope,
    /// if it was a different one.
    pub async fn join(
        &self,
        key: &ScopeKey,
        profile_id: &str,
        connection_id: ConnectionId,
    ) -> Option<ConnectionId> {
        self.update(key, |members| {
            members
                .insert(profile_id.to_string(), connection_id)
                .filter(|prev| *prev != connection_id)
        })
        .await
    }

    /// Binds `profile_id` to `connection_id` unless the slot is held by a
    /// different connection. Returns false, leaving the scope untouched, if
    /// it is.
    pub async fn claim(&self, key: &ScopeKey, profile_id: &str, connection_id: ConnectionId) -> bool {
        self.update(key, |members| match members.get(profile_id) {
            Some(holder) => *holder == connection_id,
            None => {
                members.insert(profile_id.to_string(), connection_id);
                true
            }
        })
        .await
    }

    /// Runs `update` under the write lock of a scope, creating the scope if
    /// needed. The outer lock is held throughout so a concurrent `leave`
    /// cannot drop the scope in between.
    async fn update<R>(&self, key: &ScopeKey, update: impl FnOnce(&mut Members) -> R) -> R {
        {
            let scopes = self.scopes.read().await;
            if let Some(scope) = scopes.get(key) {
                return update(&mut *scope.write().await);
            }
        }

        let mut scopes = self.scopes.write().await;
        let scope = scopes.entry(key.clone()).or_insert_with(|| {
            debug!(scope = %key, "Creating scope");
            Arc::default()
        });
        update(&mut *scope.write().await)
    }

    /// Removes `profile_id` from a scope if it is still bound to
    /// `connection_id`. Empty scopes are dropped.
    pub async fn leave(&self, key: &ScopeKey, profile_id: &str, connection_id: ConnectionId) -> bool {
        let now_empty = {
            let scopes = self.scopes.read().await;
            let Some(scope) = scopes.get(key) else {
                return false;
            };
            let mut members = scope.write().await;
            if members.get(profile_id) != Some(&connection_id) {
                return false;
            }
            members.remove(profile_id);
            members.is_empty()
        };

        if now_empty {
            let mut scopes = self.scopes.write().await;
            // A join may have landed between the two locks.
            let still_empty = match scopes.get(key) {
                Some(scope) => scope.read().await.is_empty(),
                None => false,
            };
            if still_empty {
                scopes.remove(key);
                debug!(scope = %key, "Dropped empty scope");
            }
        }
        true
    }

    /// Connection bound to `profile_id` in a scope.
    pub async fn member(&self, key: &ScopeKey, profile_id: &str) -> Option<ConnectionId> {
        let scopes = self.scopes.read().await;
        let scope = scopes.get(key)?;
        scope.read().await.get(profile_id).copied()
    }

    /// Copy of a scope's member map, taken under one read lock.
    pub async fn snapshot(&self, key: &ScopeKey) -> Option<HashMap<String, ConnectionId>> {
        let scopes = self.scopes.read().await;
        let scope = scopes.get(key)?;
        let members = scope.read().await.clone();
        Some(members)
    }

    /// Snapshot of a scope's members, sorted by connection id.
    pub async fn members(&self, key: &ScopeKey) -> Vec<(String, ConnectionId)> {
        let mut members: Vec<_> = self
            .snapshot(key)
            .await
            .unwrap_or_default()
            .into_iter()
            .collect();
        members.sort_by_key(|(_, conn)| *conn);
        members
    }

    /// Number of live scopes.
    pub async fn scope_count(&self) -> usize {
        self.scopes.read().await.len()
    }
}
