//! Error types for the danmaku client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use bililive_danmaku::{Result, Error};
//!
//! fn check(buffer: &[u8]) -> Result<()> {
//!     let frames = bililive_danmaku::protocol::decode(buffer)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Connection | [`Error::Connection`], [`Error::ConnectTimeout`], [`Error::ConnectionClosed`], [`Error::Transport`] |
//! | Protocol | [`Error::Frame`], [`Error::Decompress`] |
//! | Session | [`Error::Auth`], [`Error::HandshakeTimeout`], [`Error::HeartbeatTimeout`] |
//! | Resolution | [`Error::Resolve`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! Every recoverable error routes the lifecycle manager into a reconnect
//! cycle; nothing in this taxonomy is fatal to the host process.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport failed to open.
    ///
    /// Returned when a connection attempt cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connect attempt exceeded its time bound.
    #[error("Connect timeout after {timeout_ms}ms")]
    ConnectTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The server closed the connection gracefully.
    ///
    /// Returned when the receive path observes end-of-stream mid-session.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Abrupt transport failure on an established connection.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Malformed frame header or length mismatch.
    ///
    /// Returned when a buffer does not tile into valid frames.
    #[error("Frame error: {message}")]
    Frame {
        /// Description of the framing violation.
        message: String,
    },

    /// Corrupt compressed payload.
    #[error("Decompression error: {message}")]
    Decompress {
        /// Description of the decompression failure.
        message: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Handshake ack carried a nonzero code.
    #[error("Handshake rejected with code {code}")]
    Auth {
        /// The ack code returned by the server.
        code: i64,
    },

    /// No handshake ack within the configured bound.
    #[error("Handshake ack timeout after {timeout_ms}ms")]
    HandshakeTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// No heartbeat reply within the configured bound.
    #[error("Heartbeat reply timeout after {timeout_ms}ms")]
    HeartbeatTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// The resolver produced no usable server.
    #[error("Resolve error: {message}")]
    Resolve {
        /// Description of the resolution failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connect timeout error.
    #[inline]
    pub fn connect_timeout(timeout_ms: u64) -> Self {
        Self::ConnectTimeout { timeout_ms }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a frame error.
    #[inline]
    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    /// Creates a decompression error.
    #[inline]
    pub fn decompress(message: impl Into<String>) -> Self {
        Self::Decompress {
            message: message.into(),
        }
    }

    /// Creates an auth error from a handshake ack code.
    #[inline]
    pub fn auth(code: i64) -> Self {
        Self::Auth { code }
    }

    /// Creates a handshake timeout error.
    #[inline]
    pub fn handshake_timeout(timeout_ms: u64) -> Self {
        Self::HandshakeTimeout { timeout_ms }
    }

    /// Creates a heartbeat timeout error.
    #[inline]
    pub fn heartbeat_timeout(timeout_ms: u64) -> Self {
        Self::HeartbeatTimeout { timeout_ms }
    }

    /// Creates a resolve error.
    #[inline]
    pub fn resolve(message: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout { .. }
                | Self::HandshakeTimeout { .. }
                | Self::HeartbeatTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectTimeout { .. }
                | Self::ConnectionClosed
                | Self::Transport { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable by reconnecting.
    ///
    /// The lifecycle manager retries every recoverable error with backoff.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Json(_))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_auth_display() {
        let err = Error::auth(-101);
        assert_eq!(err.to_string(), "Handshake rejected with code -101");
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::connect_timeout(5000).is_timeout());
        assert!(Error::handshake_timeout(10_000).is_timeout());
        assert!(Error::heartbeat_timeout(30_000).is_timeout());
        assert!(!Error::connection("test").is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::transport("reset by peer").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(!Error::frame("bad header").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::heartbeat_timeout(30_000).is_recoverable());
        assert!(Error::auth(1).is_recoverable());
        assert!(Error::decompress("corrupt").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
