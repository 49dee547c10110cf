//! Core types: connection identity, scope membership, tracing setup

pub mod connection;
pub mod tracing;

pub use connection::{ConnectionId, ScopeMembership};
pub use self::tracing::{SpanEvents, TracingConfig, TracingError, TracingOutputFormat, init_tracing};
