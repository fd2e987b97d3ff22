//! Connection lifecycle state machine.
//!
//! One session task owns the whole life of a client: resolve an address,
//! open a fresh transport, handshake, then pump frames while keeping the
//! heartbeat alive. Any recoverable failure tears the attempt down and
//! re-enters the cycle after a backoff delay; only a stop signal ends it.
//!
//! ```text
//! resolve → connect → handshake → pump ──failure──→ backoff ──→ resolve …
//!                                   │
//!                                 stop ──→ Closed
//! ```
//!
//! The session exclusively owns its current transport. A new transport is
//! opened for every attempt and discarded on teardown, never reused.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::events::ConnectionState;
use crate::protocol::{self, HandshakeAck, HandshakePayload, Operation};
use crate::resolver::{DanmuInfo, ServerResolver};
use crate::transport::{Connector, ServerAddr, Transport};

use super::backoff::Backoff;
use super::config::ClientConfig;
use super::dispatch::Dispatcher;

// ============================================================================
// Constants
// ============================================================================

/// Sequence id of the handshake frame; later frames count up from here.
const HANDSHAKE_SEQUENCE: u32 = 1;

// ============================================================================
// Session
// ============================================================================

/// The background task driving one client's connection lifecycle.
pub(crate) struct Session {
    pub(crate) config: ClientConfig,
    pub(crate) resolver: Arc<dyn ServerResolver>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) state: Arc<Mutex<ConnectionState>>,
    pub(crate) stop_rx: watch::Receiver<bool>,
}

impl Session {
    /// Runs the reconnect cycle until stop is signalled.
    ///
    /// Retries are unbounded; every recoverable error re-enters the cycle
    /// after a backoff delay.
    pub(crate) async fn run(self) {
        let mut stop_rx = self.stop_rx.clone();
        let mut backoff = Backoff::new(self.config.backoff);
        let mut cached: Option<DanmuInfo> = None;
        let mut attempt: u64 = 0;

        info!(room_id = self.config.room_id, "session starting");

        loop {
            if *stop_rx.borrow() {
                break;
            }

            self.set_state(ConnectionState::Connecting);

            match self
                .connect_and_run(&mut stop_rx, &mut cached, &mut backoff, attempt)
                .await
            {
                // Ok means stop was observed somewhere inside the cycle.
                Ok(()) => break,
                Err(e) => {
                    warn!(error = %e, attempt, "connection cycle ended");
                }
            }

            attempt += 1;
            if *stop_rx.borrow() {
                break;
            }

            self.set_state(ConnectionState::Reconnecting);
            let delay = backoff.next_delay();
            debug!(
                delay_ms = delay.as_millis() as u64,
                retry = backoff.attempt(),
                "backing off"
            );
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = stop_rx.changed() => break,
            }
        }

        self.set_state(ConnectionState::Closed);
        info!(room_id = self.config.room_id, "session closed");
    }

    /// One full connection attempt: resolve, connect, authenticate, pump.
    async fn connect_and_run(
        &self,
        stop_rx: &mut watch::Receiver<bool>,
        cached: &mut Option<DanmuInfo>,
        backoff: &mut Backoff,
        attempt: u64,
    ) -> Result<()> {
        let info = match cached {
            Some(info) => info.clone(),
            None => {
                let info = self.resolver.resolve(self.config.room_id).await?;
                if info.hosts.is_empty() {
                    return Err(Error::resolve("resolver returned no hosts"));
                }
                debug!(hosts = info.hosts.len(), "resolved danmaku servers");
                *cached = Some(info.clone());
                info
            }
        };

        let server = &info.hosts[(attempt as usize) % info.hosts.len()];
        let addr = ServerAddr {
            host: server.host.clone(),
            port: server.port_for(self.config.transport),
        };

        // A fresh transport per attempt; the previous one is gone for good.
        let connected = tokio::select! {
            result = self.connector.connect(&addr, self.config.connect_timeout) => result,
            _ = stop_rx.changed() => return Ok(()),
        };

        let result = match connected {
            Ok(transport) => {
                let result = self
                    .run_authenticated(stop_rx, &*transport, &info, backoff)
                    .await;
                transport.close().await;
                result
            }
            Err(e) => Err(e),
        };

        if result.is_err() && (attempt as usize + 1) % info.hosts.len() == 0 {
            // Every candidate has now failed once; next cycle resolves fresh.
            *cached = None;
        }

        result
    }

    /// Handshakes on an open transport, then pumps until failure or stop.
    async fn run_authenticated(
        &self,
        stop_rx: &mut watch::Receiver<bool>,
        transport: &dyn Transport,
        info: &DanmuInfo,
        backoff: &mut Backoff,
    ) -> Result<()> {
        self.set_state(ConnectionState::Handshaking);

        let payload =
            HandshakePayload::new(self.config.uid, self.config.room_id, info.token.clone());
        let packet = protocol::encode(Operation::Handshake, HANDSHAKE_SEQUENCE, &payload.to_body()?);
        transport.send(packet).await?;

        let ack = tokio::select! {
            result = time::timeout(self.config.handshake_timeout, wait_for_ack(transport)) => {
                result.map_err(|_| {
                    Error::handshake_timeout(self.config.handshake_timeout.as_millis() as u64)
                })??
            }
            _ = stop_rx.changed() => return Ok(()),
        };

        if !ack.is_ok() {
            return Err(Error::auth(ack.code));
        }

        info!(room_id = self.config.room_id, "authenticated");
        backoff.reset();
        self.set_state(ConnectionState::Authenticated);

        self.pump(stop_rx, transport).await
    }

    /// The live phase: receive loop and heartbeat timer, multiplexed.
    ///
    /// Decoded frames dispatch synchronously before the next read resumes,
    /// preserving arrival order. Neither wait is unbounded: a missed
    /// heartbeat reply is a timeout, and stop interrupts everything.
    async fn pump(
        &self,
        stop_rx: &mut watch::Receiver<bool>,
        transport: &dyn Transport,
    ) -> Result<()> {
        let mut heartbeat = time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sequence = HANDSHAKE_SEQUENCE;
        let mut reply_deadline: Option<Instant> = None;

        loop {
            // The deadline arm is gated off while no reply is owed; it still
            // needs some instant to poll against.
            let deadline = reply_deadline
                .unwrap_or_else(|| Instant::now() + self.config.heartbeat_reply_timeout);

            tokio::select! {
                _ = stop_rx.changed() => return Ok(()),

                _ = heartbeat.tick() => {
                    sequence = sequence.wrapping_add(1);
                    transport
                        .send(protocol::encode(Operation::Heartbeat, sequence, b""))
                        .await?;
                    trace!(sequence, "heartbeat sent");
                    if reply_deadline.is_none() {
                        reply_deadline =
                            Some(Instant::now() + self.config.heartbeat_reply_timeout);
                    }
                }

                _ = time::sleep_until(deadline), if reply_deadline.is_some() => {
                    return Err(Error::heartbeat_timeout(
                        self.config.heartbeat_reply_timeout.as_millis() as u64,
                    ));
                }

                received = transport.receive() => {
                    match received? {
                        None => return Err(Error::ConnectionClosed),
                        Some(packet) => {
                            for frame in protocol::decode(&packet)? {
                                if frame.operation() == Operation::HeartbeatReply {
                                    reply_deadline = None;
                                }
                                self.dispatcher.dispatch(&frame);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Records and publishes a state transition.
    fn set_state(&self, new: ConnectionState) {
        {
            let mut state = self.state.lock();
            if *state == new {
                return;
            }
            *state = new;
        }
        debug!(state = %new, "connection state changed");
        self.dispatcher.publish_state(new);
    }
}

// ============================================================================
// Handshake Wait
// ============================================================================

/// Reads until the server's handshake ack arrives.
///
/// The caller bounds this with the handshake timeout.
async fn wait_for_ack(transport: &dyn Transport) -> Result<HandshakeAck> {
    loop {
        match transport.receive().await? {
            None => return Err(Error::ConnectionClosed),
            Some(packet) => {
                for frame in protocol::decode(&packet)? {
                    if frame.operation() == Operation::HandshakeAck {
                        return HandshakeAck::from_body(frame.body());
                    }
                    trace!(operation = ?frame.operation(), "frame before ack, ignoring");
                }
            }
        }
    }
}
