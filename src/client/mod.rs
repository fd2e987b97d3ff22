//! The danmaku client: public handle and connection lifecycle.
//!
//! [`DanmakuClient`] is the crate's entry point. Construction is cheap;
//! [`DanmakuClient::start`] spawns the background session task that owns the
//! connection, and [`DanmakuClient::stop`] tears everything down. Domain
//! events stream out of [`DanmakuClient::subscribe`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `backoff` | Reconnect delay schedule |
//! | `config` | Client configuration |
//! | `dispatch` | Frame-to-event classification and publication |
//! | `session` | The connection lifecycle state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Reconnect backoff schedule.
pub mod backoff;

/// Client configuration.
pub mod config;

/// Event dispatcher.
mod dispatch;

/// Connection lifecycle state machine.
mod session;

pub use backoff::BackoffConfig;
pub use config::ClientConfig;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, trace, warn};

use crate::events::{ConnectionState, Event};
use crate::resolver::ServerResolver;
use crate::transport::{Connector, DefaultConnector};

use self::dispatch::Dispatcher;
use self::session::Session;

// ============================================================================
// DanmakuClient
// ============================================================================

/// A reconnecting danmaku client for one live room.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use bililive_danmaku::{ClientConfig, DanmakuClient, Event, StaticResolver};
///
/// #[tokio::main]
/// async fn main() {
///     let client = DanmakuClient::new(
///         ClientConfig::new(23058),
///         Arc::new(StaticResolver::fallback()),
///     );
///
///     let mut events = client.subscribe();
///     client.start();
///
///     while let Ok(event) = events.recv().await {
///         if let Event::Danmaku { user, text, .. } = event {
///             println!("{user}: {text}");
///         }
///     }
/// }
/// ```
pub struct DanmakuClient {
    config: ClientConfig,
    resolver: Arc<dyn ServerResolver>,
    connector: Arc<dyn Connector>,
    dispatcher: Dispatcher,
    state: Arc<Mutex<ConnectionState>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl DanmakuClient {
    /// Creates a client using the transport kind named in `config`.
    #[must_use]
    pub fn new(config: ClientConfig, resolver: Arc<dyn ServerResolver>) -> Self {
        let connector = Arc::new(DefaultConnector::new(config.transport));
        Self::with_connector(config, resolver, connector)
    }

    /// Creates a client with a custom connector.
    ///
    /// This is the seam for substituting transports: in-memory ones in
    /// tests, or anything else that can open a [`crate::transport::Transport`].
    #[must_use]
    pub fn with_connector(
        config: ClientConfig,
        resolver: Arc<dyn ServerResolver>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let dispatcher = Dispatcher::new(config.event_buffer);
        let (stop_tx, stop_rx) = watch::channel(false);

        Self {
            config,
            resolver,
            connector,
            dispatcher,
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            stop_tx,
            stop_rx,
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Subscribes to the event stream.
    ///
    /// Every subscriber sees events in arrival order. Subscribe before
    /// calling [`DanmakuClient::start`] to observe the first transitions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.dispatcher.subscribe()
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Returns the configuration this client was built with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Spawns the connection lifecycle task.
    ///
    /// Must be called within a tokio runtime. Calling again while running,
    /// or after [`DanmakuClient::stop`], is a no-op.
    pub fn start(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            warn!("start called on a closed client");
            return;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            debug!("client already started");
            return;
        }

        let session = Session {
            config: self.config.clone(),
            resolver: Arc::clone(&self.resolver),
            connector: Arc::clone(&self.connector),
            dispatcher: self.dispatcher.clone(),
            state: Arc::clone(&self.state),
            stop_rx: self.stop_rx.clone(),
        };

        // The task ends on its own once stop is signalled; no handle kept.
        tokio::spawn(session.run());
    }

    /// Stops the client from any state.
    ///
    /// Halts the heartbeat, aborts the pending receive, closes the
    /// transport, and reaches [`ConnectionState::Closed`] exactly once.
    /// Idempotent: repeat calls are no-ops.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            trace!("stop called again, already closing");
            return;
        }

        debug!("stop requested");
        let _ = self.stop_tx.send(true);

        if !self.started.load(Ordering::SeqCst) {
            // No session task exists to publish the terminal state.
            *self.state.lock() = ConnectionState::Closed;
            self.dispatcher.publish_state(ConnectionState::Closed);
        }
    }
}

impl Drop for DanmakuClient {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests
// ============================================================================
