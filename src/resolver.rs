//! Server address resolution.
//!
//! The danmaku servers for a room are discovered out of band: a metadata API
//! maps a room id to a list of candidate hosts (each listening on tcp, ws,
//! and wss ports) plus an auth token consumed by the handshake. That API is
//! an external collaborator; this module only defines the boundary the
//! lifecycle manager consumes, and a [`StaticResolver`] for fixed addresses
//! and tests.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::transport::TransportKind;

// ============================================================================
// Constants
// ============================================================================

/// Well-known fallback host used when no resolver data is available.
pub const FALLBACK_HOST: &str = "broadcastlv.chat.bilibili.com";

// ============================================================================
// HostServer
// ============================================================================

/// One candidate danmaku server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostServer {
    /// Server hostname.
    pub host: String,
    /// Raw TCP port.
    pub port: u16,
    /// Plain WebSocket port.
    pub ws_port: u16,
    /// Secure WebSocket port.
    pub wss_port: u16,
}

impl HostServer {
    /// Creates a candidate listening on the protocol's default ports.
    #[must_use]
    pub fn with_default_ports(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: TransportKind::Tcp.default_port(),
            ws_port: TransportKind::Ws.default_port(),
            wss_port: TransportKind::Wss.default_port(),
        }
    }

    /// Returns the port for the given transport kind.
    ///
    /// A zero port falls back to the transport's default.
    #[inline]
    #[must_use]
    pub fn port_for(&self, kind: TransportKind) -> u16 {
        let port = match kind {
            TransportKind::Tcp => self.port,
            TransportKind::Ws => self.ws_port,
            TransportKind::Wss => self.wss_port,
        };
        if port == 0 { kind.default_port() } else { port }
    }
}

// ============================================================================
// DanmuInfo
// ============================================================================

/// Resolved connection material for one room.
#[derive(Debug, Clone)]
pub struct DanmuInfo {
    /// Candidate servers, in preference order.
    pub hosts: Vec<HostServer>,
    /// Auth token presented in the handshake payload.
    pub token: String,
}

// ============================================================================
// ServerResolver
// ============================================================================

/// Maps a room id to candidate servers and an auth token.
///
/// Implementations typically wrap the platform's REST metadata API. The
/// lifecycle manager calls this once per connection cycle and caches the
/// result across host-rotation attempts.
#[async_trait]
pub trait ServerResolver: Send + Sync {
    /// Resolves connection material for `room_id`.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Resolve`] when no usable server can be produced.
    async fn resolve(&self, room_id: u64) -> Result<DanmuInfo>;
}

// ============================================================================
// StaticResolver
// ============================================================================

/// A resolver that always returns a fixed answer.
///
/// Useful for tests and for rooms that accept anonymous sessions against the
/// well-known fallback host.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    info: DanmuInfo,
}

impl StaticResolver {
    /// Creates a resolver returning exactly `info`.
    #[must_use]
    pub fn new(info: DanmuInfo) -> Self {
        Self { info }
    }

    /// Creates a resolver for the well-known fallback host with no token.
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(DanmuInfo {
            hosts: vec![HostServer::with_default_ports(FALLBACK_HOST)],
            token: String::new(),
        })
    }
}

#[async_trait]
impl ServerResolver for StaticResolver {
    async fn resolve(&self, _room_id: u64) -> Result<DanmuInfo> {
        Ok(self.info.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_for_picks_transport_port() {
        let server = HostServer {
            host: "example.com".into(),
            port: 2243,
            ws_port: 2244,
            wss_port: 443,
        };

        assert_eq!(server.port_for(TransportKind::Tcp), 2243);
        assert_eq!(server.port_for(TransportKind::Ws), 2244);
        assert_eq!(server.port_for(TransportKind::Wss), 443);
    }

    #[test]
    fn test_port_for_zero_falls_back_to_default() {
        let server = HostServer {
            host: "example.com".into(),
            port: 0,
            ws_port: 0,
            wss_port: 0,
        };

        assert_eq!(
            server.port_for(TransportKind::Wss),
            TransportKind::Wss.default_port()
        );
    }

    #[tokio::test]
    async fn test_static_resolver_returns_fixed_info() {
        let resolver = StaticResolver::fallback();
        let info = resolver.resolve(1).await.expect("resolve");

        assert_eq!(info.hosts.len(), 1);
        assert_eq!(info.hosts[0].host, FALLBACK_HOST);
        assert!(info.token.is_empty());
    }
}
