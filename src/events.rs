//! Domain events published by the client.
//!
//! Every decoded message frame and every connection state transition turns
//! into one [`Event`] on the broadcast channel returned by
//! [`crate::DanmakuClient::subscribe`]. Events are immutable and
//! fire-and-forget; the core retains nothing after publication, and
//! publication order matches arrival order for every subscriber.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::Value;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle states of a danmaku connection.
///
/// ```text
/// Disconnected → Connecting → Handshaking → Authenticated
///                    ↑                           │
///                    └────── Reconnecting ←──────┘
///
/// any state ── stop() ──→ Closed (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection attempt has been made yet.
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// Handshake sent; waiting for the server's ack.
    Handshaking,
    /// Handshake accepted; receive loop and heartbeat are live.
    Authenticated,
    /// A recoverable failure occurred; waiting out the backoff delay.
    Reconnecting,
    /// Explicitly stopped. Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns `true` once the state machine can no longer make progress.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Handshaking => "handshaking",
            Self::Authenticated => "authenticated",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Event
// ============================================================================

/// A typed domain event decoded from the message stream.
///
/// Commands the dispatcher does not recognize surface as [`Event::Raw`] so
/// subscribers can still observe them.
#[derive(Debug, Clone)]
pub enum Event {
    /// A scrolling chat message in the room.
    Danmaku {
        /// Sender's user id.
        uid: u64,
        /// Sender's display name.
        user: String,
        /// Message text.
        text: String,
    },

    /// A gift sent to the streamer.
    GiftSend {
        /// Sender's display name.
        user: String,
        /// Gift name.
        gift: String,
        /// Number of gifts in this batch.
        count: u64,
    },

    /// The room's title or area changed.
    RoomChange {
        /// New room title.
        title: String,
        /// New area name.
        area: String,
    },

    /// Heartbeat reply carrying the room's current popularity.
    HeartbeatReply {
        /// Popularity counter reported by the server.
        popularity: u32,
    },

    /// The connection moved to a new lifecycle state.
    ConnectionStateChanged(ConnectionState),

    /// A command the dispatcher does not map to a typed event.
    Raw {
        /// The command name from the envelope.
        cmd: String,
        /// The full envelope body.
        payload: Value,
    },
}

impl Event {
    /// Returns the new state if this is a state-change event.
    #[inline]
    #[must_use]
    pub fn state(&self) -> Option<ConnectionState> {
        match self {
            Self::ConnectionStateChanged(state) => Some(*state),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Authenticated.to_string(), "authenticated");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn test_only_closed_is_terminal() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Reconnecting.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
    }

    #[test]
    fn test_event_state_accessor() {
        let event = Event::ConnectionStateChanged(ConnectionState::Connecting);
        assert_eq!(event.state(), Some(ConnectionState::Connecting));

        let event = Event::HeartbeatReply { popularity: 7 };
        assert_eq!(event.state(), None);
    }
}
