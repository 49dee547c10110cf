//! Server configuration.

use std::time::Duration;

use crossfire_protocol::{MAX_MESSAGE_SIZE, ProtocolVersion};

/// Signaling server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// How long a new connection may stay unauthenticated.
    pub handshake_timeout: Duration,

    /// Largest inbound payload accepted, in bytes.
    pub max_message_size: usize,

    /// Consecutive undecodable messages tolerated before closing.
    pub max_decode_errors: u32,

    /// Whether a dropped undecodable message is reported back to its sender.
    pub notify_decode_errors: bool,

    /// Protocol versions the server accepts, in order of preference.
    pub supported_versions: Vec<ProtocolVersion>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            max_message_size: MAX_MESSAGE_SIZE,
            max_decode_errors: 3,
            notify_decode_errors: true,
            supported_versions: vec![ProtocolVersion::CURRENT],
        }
    }
}

impl ServerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set handshake timeout.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Builder: set max inbound message size.
    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    /// Builder: set decode error tolerance. Zero closes on the first failure.
    pub fn with_max_decode_errors(mut self, max: u32) -> Self {
        self.max_decode_errors = max;
        self
    }

    /// Builder: set whether decode errors are reported to the peer.
    pub fn with_notify_decode_errors(mut self, notify: bool) -> Self {
        self.notify_decode_errors = notify;
        self
    }

    /// Builder: set supported protocol versions.
    pub fn with_supported_versions(mut self, versions: Vec<ProtocolVersion>) -> Self {
        self.supported_versions = versions;
        self
    }

    /// Returns true if `version` is accepted by this server.
    pub fn supports(&self, version: ProtocolVersion) -> bool {
        self.supported_versions.contains(&version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        assert_eq!(config.max_message_size, 1024 * 1024);
        assert_eq!(config.max_decode_errors, 3);
        assert!(config.notify_decode_errors);
        assert!(config.supports(ProtocolVersion::V1_0));
    }

    #[test]
    fn custom_config() {
        let config = ServerConfig::new()
            .with_handshake_timeout(Duration::from_millis(250))
            .with_max_message_size(4096)
            .with_max_decode_errors(0)
            .with_notify_decode_errors(false)
            .with_supported_versions(Vec::new());

        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
        assert_eq!(config.max_message_size, 4096);
        assert_eq!(config.max_decode_errors, 0);
        assert!(!config.notify_decode_errors);
        assert!(!config.supports(ProtocolVersion::V1_0));
    }
}
