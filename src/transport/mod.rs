//! Transport layer.
//!
//! One danmaku server speaks the same frame protocol over three byte-stream
//! transports: secure WebSocket, plain WebSocket, and raw TCP. This module
//! hides the difference behind the [`Transport`] capability trait; which
//! concrete transport gets opened is a [`TransportKind`] configuration
//! choice made by the [`Connector`], never a type-hierarchy decision.
//!
//! A transport carries no retry logic. A single failed attempt is reported
//! upward, and the lifecycle manager decides whether to open a fresh one.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `ws` | WebSocket transport (secure and plain) |
//! | `tcp` | Raw TCP transport with partial-read packet reassembly |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket transport.
pub mod ws;

/// Raw TCP transport.
pub mod tcp;

pub use tcp::TcpTransport;
pub use ws::WsTransport;

// ============================================================================
// TransportKind
// ============================================================================

/// Which concrete transport to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    /// Secure WebSocket (`wss://host:port/sub`).
    #[default]
    Wss,
    /// Plain WebSocket (`ws://host:port/sub`).
    Ws,
    /// Raw TCP carrying bare frames with no WebSocket envelope.
    Tcp,
}

impl TransportKind {
    /// Returns the default server port for this transport.
    #[inline]
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Wss => 443,
            Self::Ws => 2244,
            Self::Tcp => 2243,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wss => "wss",
            Self::Ws => "ws",
            Self::Tcp => "tcp",
        };
        f.write_str(name)
    }
}

// ============================================================================
// ServerAddr
// ============================================================================

/// A resolved host/port pair to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    /// Server hostname.
    pub host: String,
    /// Server port for the chosen transport.
    pub port: u16,
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Uniform capability surface over an open byte-stream connection.
///
/// # Contract
///
/// - `send` serializes writes internally: at most one send is in flight at a
///   time, so concurrent callers can never interleave partial frames.
/// - `receive` yields one complete wire packet per call and has a single
///   consumer: only the lifecycle manager's receive loop reads.
/// - A transport is owned by exactly one connection attempt and is never
///   reused after a reconnect.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one encoded packet.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] (or the underlying transport's error) when the
    /// connection is not open or the write fails.
    async fn send(&self, packet: Bytes) -> Result<()>;

    /// Receives the next complete wire packet.
    ///
    /// Returns `Ok(None)` on graceful close.
    ///
    /// # Errors
    ///
    /// [`Error::Transport`] (or the underlying transport's error) on abrupt
    /// close or a malformed stream.
    async fn receive(&self) -> Result<Option<Bytes>>;

    /// Closes the connection. Idempotent.
    async fn close(&self);

    /// Returns `true` while the connection is open.
    fn is_connected(&self) -> bool;
}

// ============================================================================
// Connector
// ============================================================================

/// Opens fresh transports for connection attempts.
///
/// The lifecycle manager asks its connector for a brand-new transport on
/// every attempt; this is also the seam tests use to substitute an in-memory
/// transport.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a transport to `addr`, bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the transport fails to open
    /// - [`Error::ConnectTimeout`] if the attempt exceeds `timeout`
    async fn connect(&self, addr: &ServerAddr, timeout: Duration) -> Result<Box<dyn Transport>>;
}

// ============================================================================
// DefaultConnector
// ============================================================================

/// Connector dispatching on a configured [`TransportKind`].
#[derive(Debug, Clone, Copy)]
pub struct DefaultConnector {
    kind: TransportKind,
}

impl DefaultConnector {
    /// Creates a connector for the given transport kind.
    #[inline]
    #[must_use]
    pub fn new(kind: TransportKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl Connector for DefaultConnector {
    async fn connect(&self, addr: &ServerAddr, timeout: Duration) -> Result<Box<dyn Transport>> {
        debug!(kind = %self.kind, addr = %addr, "opening transport");

        let attempt = async {
            let transport: Box<dyn Transport> = match self.kind {
                TransportKind::Wss => Box::new(WsTransport::connect(addr, true).await?),
                TransportKind::Ws => Box::new(WsTransport::connect(addr, false).await?),
                TransportKind::Tcp => Box::new(TcpTransport::connect(addr).await?),
            };
            Ok(transport)
        };

        tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| Error::connect_timeout(timeout.as_millis() as u64))?
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(TransportKind::Wss.default_port(), 443);
        assert_eq!(TransportKind::Ws.default_port(), 2244);
        assert_eq!(TransportKind::Tcp.default_port(), 2243);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TransportKind::Wss.to_string(), "wss");
        assert_eq!(TransportKind::Tcp.to_string(), "tcp");
    }

    #[test]
    fn test_addr_display() {
        let addr = ServerAddr {
            host: "example.com".into(),
            port: 443,
        };
        assert_eq!(addr.to_string(), "example.com:443");
    }
}
