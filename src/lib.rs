//! Real-time danmaku (live chat) client for Bilibili live rooms.
//!
//! This library maintains a long-lived connection to a room's danmaku
//! server: it authenticates with a handshake, decodes the platform's binary
//! frame protocol (including zlib/brotli-compressed containers), keeps the
//! connection alive with heartbeats, and recovers from any network failure
//! with jittered exponential backoff. Decoded messages surface as typed
//! events on a broadcast channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   host/port/token   ┌──────────────────┐
//! │ Resolver │────────────────────►│ DanmakuClient    │
//! └──────────┘                     │  (lifecycle task)│
//!                                  └───────┬──────────┘
//!                 wss / ws / tcp           │ frames
//!                ┌─────────────┐           ▼
//!   server ◄────►│  Transport  │──► codec ──► dispatcher ──► subscribers
//!                └─────────────┘
//! ```
//!
//! Key design principles:
//!
//! - One lifecycle manager parameterized over a small [`transport::Transport`]
//!   capability trait; the concrete transport is a configuration choice
//! - A fresh transport per connection attempt, never reused across reconnects
//! - Events are plain values on a channel, free of any UI-thread concern
//! - Every failure short of [`DanmakuClient::stop`] is retried forever
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bililive_danmaku::{ClientConfig, DanmakuClient, Event, StaticResolver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = DanmakuClient::new(
//!         ClientConfig::new(23058),
//!         Arc::new(StaticResolver::fallback()),
//!     );
//!
//!     let mut events = client.subscribe();
//!     client.start();
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             Event::Danmaku { user, text, .. } => println!("{user}: {text}"),
//!             Event::ConnectionStateChanged(state) => eprintln!("[{state}]"),
//!             _ => {}
//!         }
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`DanmakuClient`], configuration, backoff |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`events`] | Domain events and connection states |
//! | [`protocol`] | Wire frame layout and packet codec |
//! | [`resolver`] | Server address resolution boundary |
//! | [`transport`] | Transport capability trait and implementations |

// ============================================================================
// Modules
// ============================================================================

/// The danmaku client and its configuration.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Domain events published to subscribers.
pub mod events;

/// Wire protocol: frames, codec, handshake bodies.
pub mod protocol;

/// Server address resolution.
pub mod resolver;

/// Transport layer: secure/plain WebSocket and raw TCP.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{BackoffConfig, ClientConfig, DanmakuClient};

// Error types
pub use error::{Error, Result};

// Event types
pub use events::{ConnectionState, Event};

// Resolver types
pub use resolver::{DanmuInfo, HostServer, ServerResolver, StaticResolver};

// Transport types
pub use transport::{Connector, Transport, TransportKind};
