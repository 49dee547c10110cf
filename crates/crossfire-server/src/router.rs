//! Signal routing.
//!
//! Routing is a read-only function of a signal and the scope registry. It
//! never mutates the signal or the registry, and an undeliverable signal is a
//! [`RouteOutcome::Unroutable`] value rather than an error.

use std::sync::Arc;

use thiserror::Error;
use tracing::{Instrument, Span, debug, info_span};

use crossfire_core::{ConnectionId, ScopeMembership};
use crossfire_protocol::{Delivery, MessageType, SenderPolicy, Signal, SignalLifecycle};

use crate::registry::{ScopeKey, ScopeRegistry};

/// The authenticated peer a signal came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub connection_id: ConnectionId,
    pub profile_id: String,
    pub membership: ScopeMembership,
}

/// Why a signal could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unroutable {
    /// Direct signal for a profile that is not in the sender's scope.
    #[error("recipient {recipient_profile_id} is not in the sender's {lifecycle} scope")]
    RecipientNotInScope {
        recipient_profile_id: String,
        lifecycle: SignalLifecycle,
    },

    /// The sender holds no live membership for the signal's lifecycle.
    #[error("sender is not a member of a {lifecycle} scope")]
    SenderNotInScope { lifecycle: SignalLifecycle },

    /// The message type is never relayed between peers.
    #[error("{0} is never routed")]
    ServerOnly(MessageType),
}

/// Result of routing one signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Connections to deliver to, in ascending id order. May be empty for a
    /// broadcast in a scope with no other members.
    Deliver(Vec<ConnectionId>),
    Unroutable(Unroutable),
}

impl RouteOutcome {
    /// Target connections, empty when unroutable.
    pub fn targets(&self) -> &[ConnectionId] {
        match self {
            Self::Deliver(targets) => targets,
            Self::Unroutable(_) => &[],
        }
    }
}

/// Resolves signal recipients against the scope registry.
#[derive(Debug, Clone)]
pub struct SignalRouter {
    registry: Arc<ScopeRegistry>,
    span: Span,
}

impl SignalRouter {
    pub fn new(registry: Arc<ScopeRegistry>) -> Self {
        Self {
            registry,
            span: info_span!("router"),
        }
    }

    pub fn registry(&self) -> &Arc<ScopeRegistry> {
        &self.registry
    }

    /// Computes the target connections for `signal` sent by `sender`.
    pub async fn route(&self, signal: &Signal, sender: &Sender) -> RouteOutcome {
        let message_type = signal.message_type();
        let outcome = self
            .resolve(signal, sender)
            .instrument(self.span.clone())
            .await;

        match &outcome {
            RouteOutcome::Deliver(targets) => debug!(
                parent: &self.span,
                %message_type,
                sender = %sender.connection_id,
                targets = targets.len(),
                "Routed signal"
            ),
            RouteOutcome::Unroutable(reason) => debug!(
                parent: &self.span,
                %message_type,
                sender = %sender.connection_id,
                %reason,
                "Signal unroutable"
            ),
        }
        outcome
    }

    async fn resolve(&self, signal: &Signal, sender: &Sender) -> RouteOutcome {
        let lifecycle = signal.lifecycle();
        let delivery = signal.delivery();
        if delivery == Delivery::ServerOnly {
            return RouteOutcome::Unroutable(Unroutable::ServerOnly(signal.message_type()));
        }

        let Some(key) = ScopeKey::for_membership(lifecycle, &sender.membership) else {
            return RouteOutcome::Unroutable(Unroutable::SenderNotInScope { lifecycle });
        };
        // Both checks read the same view of the scope.
        let members = self.registry.snapshot(&key).await.unwrap_or_default();
        // A peer that left the scope no longer speaks in it.
        if members.get(&sender.profile_id) != Some(&sender.connection_id) {
            return RouteOutcome::Unroutable(Unroutable::SenderNotInScope { lifecycle });
        }

        match delivery {
            Delivery::Direct => {
                let recipient = signal.recipient_profile_id().unwrap_or_default();
                match members.get(recipient) {
                    Some(target) => RouteOutcome::Deliver(vec![*target]),
                    None => RouteOutcome::Unroutable(Unroutable::RecipientNotInScope {
                        recipient_profile_id: recipient.to_string(),
                        lifecycle,
                    }),
                }
            }
            Delivery::Broadcast(policy) => {
                let mut targets: Vec<_> = members
                    .into_values()
                    .filter(|conn| {
                        policy == SenderPolicy::Include || *conn != sender.connection_id
                    })
                    .collect();
                targets.sort();
                RouteOutcome::Deliver(targets)
            }
            Delivery::ServerOnly => {
                RouteOutcome::Unroutable(Unroutable::ServerOnly(signal.message_type()))
            }
        }
    }
}
