//! WebSocket transport.
//!
//! Packets travel as binary WebSocket messages, one complete wire packet per
//! message; the WebSocket layer owns message boundaries, so no reassembly is
//! needed here. Secure (`wss`) and plain (`ws`) endpoints differ only in
//! scheme and default port; both serve the danmaku stream on `/sub`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

use super::{ServerAddr, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Path the danmaku stream is served on.
const SUB_PATH: &str = "/sub";

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// WsTransport
// ============================================================================

/// WebSocket transport over `wss://` or `ws://`.
///
/// The writer half sits behind its own async mutex so concurrent senders
/// serialize; the reader half has a single consumer by contract.
pub struct WsTransport {
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
    connected: AtomicBool,
}

impl WsTransport {
    /// Opens a WebSocket connection to `addr`.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if the URL is malformed or the connection
    /// cannot be established.
    pub async fn connect(addr: &ServerAddr, secure: bool) -> Result<Self> {
        let scheme = if secure { "wss" } else { "ws" };
        let url = Url::parse(&format!("{scheme}://{addr}{SUB_PATH}"))
            .map_err(|e| Error::connection(format!("invalid endpoint url: {e}")))?;

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::connection(e.to_string()))?;

        debug!(%url, "websocket connected");

        let (writer, reader) = stream.split();
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            connected: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, packet: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::transport("websocket is not connected"));
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.send(Message::Binary(packet)).await {
            self.connected.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Bytes>> {
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),

                Some(Ok(Message::Close(_))) | None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Ok(None);
                }

                Some(Err(e)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(e.into());
                }

                // Text, Ping, Pong, raw frames: nothing the protocol carries.
                Some(Ok(other)) => {
                    trace!(kind = ?other, "ignoring non-binary websocket message");
                }
            }
        }
    }

    async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let mut writer = self.writer.lock().await;
            let _ = writer.close().await;
            debug!("websocket closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
