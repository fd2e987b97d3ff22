//! Raw TCP transport.
//!
//! TCP carries the same frame layout with no WebSocket envelope, which also
//! means no message boundaries. Reads may deliver half a header, several
//! packets at once, or anything in between, so the receive path runs through
//! a [`PacketAssembler`] that buffers partial reads and yields exactly one
//! complete wire packet at a time.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::HEADER_LEN;

use super::{ServerAddr, Transport};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on a single packet's declared length.
///
/// The live servers never come close; a larger declaration means a corrupt
/// or hostile stream.
const MAX_PACKET_LEN: usize = 32 * 1024 * 1024;

/// Initial capacity of the reassembly buffer.
const READ_BUFFER_CAPACITY: usize = 16 * 1024;

// ============================================================================
// PacketAssembler
// ============================================================================

/// Accumulates stream bytes and extracts complete wire packets.
///
/// The first four bytes of every packet declare its total length, so the
/// assembler only needs the length prefix to know where each packet ends;
/// full header validation stays in the codec.
#[derive(Debug)]
pub(crate) struct PacketAssembler {
    buffer: BytesMut,
}

impl PacketAssembler {
    pub(crate) fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
        }
    }

    /// Returns the internal buffer for the next socket read to append into.
    pub(crate) fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Returns `true` if no partial packet is pending.
    pub(crate) fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Extracts the next complete packet, if one is buffered.
    ///
    /// # Errors
    ///
    /// [`Error::Frame`] if the declared length is shorter than a header or
    /// beyond [`MAX_PACKET_LEN`].
    pub(crate) fn next_packet(&mut self) -> Result<Option<Bytes>> {
        if self.buffer.len() < 4 {
            return Ok(None);
        }

        let declared = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]) as usize;

        if declared < HEADER_LEN {
            return Err(Error::frame(format!(
                "packet length {declared} smaller than header"
            )));
        }
        if declared > MAX_PACKET_LEN {
            return Err(Error::frame(format!(
                "packet length {declared} exceeds limit {MAX_PACKET_LEN}"
            )));
        }

        if self.buffer.len() < declared {
            return Ok(None);
        }

        Ok(Some(self.buffer.split_to(declared).freeze()))
    }
}

// ============================================================================
// TcpTransport
// ============================================================================

/// Read-side state: the socket half plus its reassembly buffer.
struct ReadState {
    half: OwnedReadHalf,
    assembler: PacketAssembler,
}

/// Raw TCP transport.
///
/// Writes go through an async mutex so concurrent senders serialize; the
/// read half and its assembler share a mutex with a single consumer by
/// contract.
pub struct TcpTransport {
    writer: Mutex<OwnedWriteHalf>,
    reader: Mutex<ReadState>,
    connected: AtomicBool,
}

impl TcpTransport {
    /// Opens a TCP connection to `addr`.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if the connection cannot be established.
    pub async fn connect(addr: &ServerAddr) -> Result<Self> {
        let stream = TcpStream::connect((addr.host.as_str(), addr.port))
            .await
            .map_err(|e| Error::connection(e.to_string()))?;
        stream.set_nodelay(true)?;

        debug!(addr = %addr, "tcp connected");

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            writer: Mutex::new(write_half),
            reader: Mutex::new(ReadState {
                half: read_half,
                assembler: PacketAssembler::new(),
            }),
            connected: AtomicBool::new(true),
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&self, packet: Bytes) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::transport("tcp socket is not connected"));
        }

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(&packet).await {
            self.connected.store(false, Ordering::SeqCst);
            return Err(Error::transport(e.to_string()));
        }
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Bytes>> {
        let mut guard = self.reader.lock().await;
        let state = &mut *guard;

        loop {
            if let Some(packet) = state.assembler.next_packet()? {
                return Ok(Some(packet));
            }

            let read = state
                .half
                .read_buf(state.assembler.buffer_mut())
                .await
                .map_err(|e| {
                    self.connected.store(false, Ordering::SeqCst);
                    Error::transport(e.to_string())
                })?;

            if read == 0 {
                self.connected.store(false, Ordering::SeqCst);
                if state.assembler.is_empty() {
                    return Ok(None);
                }
                return Err(Error::transport("connection closed mid-packet"));
            }
        }
    }

    async fn close(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            let mut writer = self.writer.lock().await;
            let _ = writer.shutdown().await;
            debug!("tcp closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
