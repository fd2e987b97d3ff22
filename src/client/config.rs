//! Client configuration.
//!
//! Timing values are configuration with defaults, never constants baked
//! into the state machine.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use bililive_danmaku::{ClientConfig, TransportKind};
//!
//! let config = ClientConfig::new(23058)
//!     .with_transport(TransportKind::Tcp)
//!     .with_heartbeat_interval(Duration::from_secs(30));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::transport::TransportKind;

use super::backoff::BackoffConfig;

// ============================================================================
// ClientConfig
// ============================================================================

/// Configuration for a [`crate::DanmakuClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The real (long) room id to join.
    pub room_id: u64,

    /// User id presented in the handshake; 0 joins anonymously.
    pub uid: u64,

    /// Which transport to open.
    pub transport: TransportKind,

    /// Bound on each transport connect attempt.
    pub connect_timeout: Duration,

    /// Bound on waiting for the handshake ack.
    pub handshake_timeout: Duration,

    /// Period between heartbeat frames.
    pub heartbeat_interval: Duration,

    /// Bound on waiting for a heartbeat reply.
    pub heartbeat_reply_timeout: Duration,

    /// Reconnect delay schedule.
    pub backoff: BackoffConfig,

    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientConfig {
    /// Creates a configuration for `room_id` with default settings.
    #[must_use]
    pub fn new(room_id: u64) -> Self {
        Self {
            room_id,
            uid: 0,
            transport: TransportKind::default(),
            connect_timeout: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_reply_timeout: Duration::from_secs(30),
            backoff: BackoffConfig::default(),
            event_buffer: 512,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientConfig {
    /// Sets the user id for the handshake.
    #[inline]
    #[must_use]
    pub fn with_uid(mut self, uid: u64) -> Self {
        self.uid = uid;
        self
    }

    /// Sets the transport kind.
    #[inline]
    #[must_use]
    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the handshake ack timeout.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the heartbeat period.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the heartbeat reply timeout.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_reply_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_reply_timeout = timeout;
        self
    }

    /// Sets the reconnect backoff bounds.
    #[inline]
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the event channel capacity.
    #[inline]
    #[must_use]
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new(42);

        assert_eq!(config.room_id, 42);
        assert_eq!(config.uid, 0);
        assert_eq!(config.transport, TransportKind::Wss);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert_eq!(config.heartbeat_reply_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_chain() {
        let config = ClientConfig::new(42)
            .with_uid(7)
            .with_transport(TransportKind::Tcp)
            .with_heartbeat_interval(Duration::from_secs(20));

        assert_eq!(config.uid, 7);
        assert_eq!(config.transport, TransportKind::Tcp);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(20));
    }
}
