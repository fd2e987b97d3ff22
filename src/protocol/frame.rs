//! Frame and header types for the danmaku wire protocol.
//!
//! Every unit on the wire is a 16-byte big-endian header followed by a body:
//!
//! ```text
//! ┌──────────────┬───────────────┬──────────────────┬───────────┬─────────────┬──────┐
//! │ packetLength │ headerLength  │ protocolVersion  │ operation │ sequenceId  │ body │
//! │     u32      │  u16 (=16)    │       u16        │    u32    │     u32     │  …   │
//! └──────────────┴───────────────┴──────────────────┴───────────┴─────────────┴──────┘
//! ```
//!
//! Invariant: `packet_length == 16 + body.len()`.

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Size of the wire header in bytes.
pub const HEADER_LEN: usize = 16;

// ============================================================================
// Operation
// ============================================================================

/// Frame operation codes.
///
/// Unknown codes are preserved numerically rather than rejected; the frame
/// layer never decides what the server is allowed to say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Client → server keepalive (2).
    Heartbeat,
    /// Server → client keepalive reply carrying room popularity (3).
    HeartbeatReply,
    /// Server → client message with a JSON command envelope (5).
    Message,
    /// Client → server handshake request with a JSON auth payload (7).
    Handshake,
    /// Server → client handshake ack with `{code: int}` (8).
    HandshakeAck,
    /// Any operation code this client does not interpret.
    Unknown(u32),
}

impl Operation {
    /// Maps a wire code to an operation.
    #[inline]
    #[must_use]
    pub fn from_wire(code: u32) -> Self {
        match code {
            2 => Self::Heartbeat,
            3 => Self::HeartbeatReply,
            5 => Self::Message,
            7 => Self::Handshake,
            8 => Self::HandshakeAck,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire code for this operation.
    #[inline]
    #[must_use]
    pub fn to_wire(self) -> u32 {
        match self {
            Self::Heartbeat => 2,
            Self::HeartbeatReply => 3,
            Self::Message => 5,
            Self::Handshake => 7,
            Self::HandshakeAck => 8,
            Self::Unknown(other) => other,
        }
    }
}

// ============================================================================
// ProtocolVersion
// ============================================================================

/// Body encoding declared in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    /// Raw body: JSON for messages, a big-endian integer for heartbeat
    /// replies (0).
    Plain,
    /// Legacy raw body, treated identically to [`ProtocolVersion::Plain`] (1).
    Legacy,
    /// Zlib-compressed body containing one or more concatenated frames (2).
    Zlib,
    /// Brotli-compressed body, same recursive structure as zlib (3).
    Brotli,
    /// Any version code this client does not interpret; the body passes
    /// through unchanged.
    Unknown(u16),
}

impl ProtocolVersion {
    /// Maps a wire code to a protocol version.
    #[inline]
    #[must_use]
    pub fn from_wire(code: u16) -> Self {
        match code {
            0 => Self::Plain,
            1 => Self::Legacy,
            2 => Self::Zlib,
            3 => Self::Brotli,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire code for this version.
    #[inline]
    #[must_use]
    pub fn to_wire(self) -> u16 {
        match self {
            Self::Plain => 0,
            Self::Legacy => 1,
            Self::Zlib => 2,
            Self::Brotli => 3,
            Self::Unknown(other) => other,
        }
    }

    /// Returns `true` if the body is a compressed container of sub-frames.
    #[inline]
    #[must_use]
    pub fn is_compressed(self) -> bool {
        matches!(self, Self::Zlib | Self::Brotli)
    }
}

// ============================================================================
// Header
// ============================================================================

/// The 16-byte wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total packet length, header included.
    pub packet_length: u32,
    /// Header length; always 16 on this protocol.
    pub header_length: u16,
    /// Body encoding.
    pub version: u16,
    /// Operation code.
    pub operation: u32,
    /// Sequence id assigned by the sender.
    pub sequence_id: u32,
}

impl Header {
    /// Decodes a header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// [`Error::Frame`] if fewer than 16 bytes are available or the declared
    /// header length is not 16.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::frame(format!(
                "truncated header: {} of {HEADER_LEN} bytes",
                buf.len()
            )));
        }

        let header = Self {
            packet_length: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            header_length: u16::from_be_bytes([buf[4], buf[5]]),
            version: u16::from_be_bytes([buf[6], buf[7]]),
            operation: u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]),
            sequence_id: u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]),
        };

        if header.header_length as usize != HEADER_LEN {
            return Err(Error::frame(format!(
                "unexpected header length {} (want {HEADER_LEN})",
                header.header_length
            )));
        }

        Ok(header)
    }

    /// Encodes this header into its 16-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.packet_length.to_be_bytes());
        out[4..6].copy_from_slice(&self.header_length.to_be_bytes());
        out[6..8].copy_from_slice(&self.version.to_be_bytes());
        out[8..12].copy_from_slice(&self.operation.to_be_bytes());
        out[12..16].copy_from_slice(&self.sequence_id.to_be_bytes());
        out
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One decoded protocol frame.
///
/// Compressed container frames never surface here; the codec unwraps them
/// into the plain frames they carry.
#[derive(Debug, Clone)]
pub struct Frame {
    operation: Operation,
    version: ProtocolVersion,
    sequence_id: u32,
    body: Bytes,
}

impl Frame {
    /// Creates a frame from its parts.
    #[inline]
    #[must_use]
    pub fn new(
        operation: Operation,
        version: ProtocolVersion,
        sequence_id: u32,
        body: Bytes,
    ) -> Self {
        Self {
            operation,
            version,
            sequence_id,
            body,
        }
    }

    /// Returns the operation.
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the body encoding declared by the sender.
    #[inline]
    #[must_use]
    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    /// Returns the sequence id.
    #[inline]
    #[must_use]
    pub fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    /// Returns the body bytes.
    #[inline]
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes the frame, returning the body.
    #[inline]
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Returns the total on-wire length of this frame.
    #[inline]
    #[must_use]
    pub fn packet_length(&self) -> u32 {
        (HEADER_LEN + self.body.len()) as u32
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_wire_mapping() {
        assert_eq!(Operation::from_wire(2), Operation::Heartbeat);
        assert_eq!(Operation::from_wire(3), Operation::HeartbeatReply);
        assert_eq!(Operation::from_wire(5), Operation::Message);
        assert_eq!(Operation::from_wire(7), Operation::Handshake);
        assert_eq!(Operation::from_wire(8), Operation::HandshakeAck);
        assert_eq!(Operation::from_wire(99), Operation::Unknown(99));

        for code in [2u32, 3, 5, 7, 8, 99] {
            assert_eq!(Operation::from_wire(code).to_wire(), code);
        }
    }

    #[test]
    fn test_version_wire_mapping() {
        assert_eq!(ProtocolVersion::from_wire(0), ProtocolVersion::Plain);
        assert_eq!(ProtocolVersion::from_wire(1), ProtocolVersion::Legacy);
        assert_eq!(ProtocolVersion::from_wire(2), ProtocolVersion::Zlib);
        assert_eq!(ProtocolVersion::from_wire(3), ProtocolVersion::Brotli);
        assert_eq!(ProtocolVersion::from_wire(42), ProtocolVersion::Unknown(42));

        assert!(ProtocolVersion::Zlib.is_compressed());
        assert!(ProtocolVersion::Brotli.is_compressed());
        assert!(!ProtocolVersion::Plain.is_compressed());
    }

    #[test]
    fn test_header_roundtrip() {
        let header = Header {
            packet_length: 16 + 5,
            header_length: 16,
            version: 0,
            operation: 5,
            sequence_id: 7,
        };

        let bytes = header.encode();
        let decoded = Header::decode(&bytes).expect("decode header");
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_rejects_truncated() {
        let err = Header::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, crate::Error::Frame { .. }));
    }

    #[test]
    fn test_header_rejects_wrong_header_length() {
        let mut bytes = Header {
            packet_length: 16,
            header_length: 16,
            version: 0,
            operation: 2,
            sequence_id: 1,
        }
        .encode();
        // Flip headerLength to 18.
        bytes[4..6].copy_from_slice(&18u16.to_be_bytes());

        let err = Header::decode(&bytes).unwrap_err();
        assert!(matches!(err, crate::Error::Frame { .. }));
    }

    #[test]
    fn test_frame_packet_length_invariant() {
        let frame = Frame::new(
            Operation::Message,
            ProtocolVersion::Plain,
            1,
            Bytes::from_static(b"{\"cmd\":\"TEST\"}"),
        );
        assert_eq!(frame.packet_length() as usize, HEADER_LEN + frame.body().len());
    }
}
