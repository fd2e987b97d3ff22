//! Packet encoding and decoding.
//!
//! [`encode`] builds an outgoing packet; [`decode`] turns a received buffer
//! into the ordered frames it carries, transparently inflating zlib and
//! brotli container bodies. Each call is independent; no state is carried
//! between packets.

// ============================================================================
// Imports
// ============================================================================

use std::io::Read;

use bytes::{Bytes, BytesMut};
use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};

use super::frame::{Frame, HEADER_LEN, Header, Operation, ProtocolVersion};

// ============================================================================
// Constants
// ============================================================================

/// Maximum depth of compressed containers inside compressed containers.
///
/// The live protocol nests exactly once; anything deeper is corrupt input.
const MAX_NESTING: usize = 4;

/// Internal buffer size handed to the brotli decompressor.
const BROTLI_BUFFER_SIZE: usize = 4096;

// ============================================================================
// Encode
// ============================================================================

/// Encodes one outgoing packet.
///
/// The header declares `protocolVersion = 0`; outgoing bodies are never
/// compressed on this protocol.
#[must_use]
pub fn encode(operation: Operation, sequence_id: u32, body: &[u8]) -> Bytes {
    let header = Header {
        packet_length: (HEADER_LEN + body.len()) as u32,
        header_length: HEADER_LEN as u16,
        version: ProtocolVersion::Plain.to_wire(),
        operation: operation.to_wire(),
        sequence_id,
    };

    let mut buf = BytesMut::with_capacity(HEADER_LEN + body.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(body);
    buf.freeze()
}

// ============================================================================
// Decode
// ============================================================================

/// Decodes a received buffer into the frames it carries, in wire order.
///
/// The declared packet lengths must exactly tile the buffer; a short or
/// overlong final packet is a framing violation, which covers truncated and
/// oversized reads. Compressed bodies (zlib, brotli) are inflated and
/// decoded recursively; a container holding N sub-frames yields exactly N
/// frames in original order.
///
/// # Errors
///
/// - [`Error::Frame`] on a malformed header or length mismatch
/// - [`Error::Decompress`] on a corrupt compressed body
pub fn decode(buf: &[u8]) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    decode_into(buf, 0, &mut frames)?;
    Ok(frames)
}

/// Walks `buf` packet by packet, appending decoded frames to `out`.
fn decode_into(buf: &[u8], depth: usize, out: &mut Vec<Frame>) -> Result<()> {
    let mut cursor = 0;

    while cursor < buf.len() {
        let remaining = &buf[cursor..];
        let header = Header::decode(remaining)?;
        let packet_length = header.packet_length as usize;

        if packet_length < HEADER_LEN {
            return Err(Error::frame(format!(
                "packet length {packet_length} smaller than header"
            )));
        }
        if packet_length > remaining.len() {
            return Err(Error::frame(format!(
                "packet length {packet_length} exceeds {} available bytes",
                remaining.len()
            )));
        }

        let body = &remaining[HEADER_LEN..packet_length];
        let version = ProtocolVersion::from_wire(header.version);

        if version.is_compressed() {
            if depth >= MAX_NESTING {
                return Err(Error::frame(format!(
                    "compressed containers nested deeper than {MAX_NESTING}"
                )));
            }
            let inflated = if version == ProtocolVersion::Zlib {
                inflate_zlib(body)?
            } else {
                inflate_brotli(body)?
            };
            decode_into(&inflated, depth + 1, out)?;
        } else {
            out.push(Frame::new(
                Operation::from_wire(header.operation),
                version,
                header.sequence_id,
                Bytes::copy_from_slice(body),
            ));
        }

        cursor += packet_length;
    }

    Ok(())
}

// ============================================================================
// Decompression
// ============================================================================

fn inflate_zlib(body: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(body)
        .read_to_end(&mut out)
        .map_err(|e| Error::decompress(format!("zlib: {e}")))?;
    Ok(out)
}

fn inflate_brotli(body: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE)
        .read_to_end(&mut out)
        .map_err(|e| Error::decompress(format!("brotli: {e}")))?;
    Ok(out)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use proptest::prelude::*;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).expect("compress");
        encoder.finish().expect("finish")
    }

    fn brotli_compress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let params = brotli::enc::BrotliEncoderParams::default();
        brotli::BrotliCompress(&mut &data[..], &mut out, &params).expect("compress");
        out
    }

    /// Builds a packet with an arbitrary version code, bypassing `encode`.
    fn raw_packet(version: u16, operation: u32, sequence_id: u32, body: &[u8]) -> Vec<u8> {
        let header = Header {
            packet_length: (HEADER_LEN + body.len()) as u32,
            header_length: HEADER_LEN as u16,
            version,
            operation,
            sequence_id,
        };
        let mut buf = header.encode().to_vec();
        buf.extend_from_slice(body);
        buf
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let body = br#"{"uid":0,"roomid":42}"#;
        let packet = encode(Operation::Handshake, 1, body);

        let frames = decode(&packet).expect("decode");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].operation(), Operation::Handshake);
        assert_eq!(frames[0].sequence_id(), 1);
        assert_eq!(frames[0].body(), body);
    }

    #[test]
    fn test_decode_empty_body() {
        let packet = encode(Operation::Heartbeat, 3, b"");
        let frames = decode(&packet).expect("decode");
        assert_eq!(frames.len(), 1);
        assert!(frames[0].body().is_empty());
    }

    #[test]
    fn test_decode_rejects_wrong_header_length() {
        let mut packet = encode(Operation::Message, 1, b"x").to_vec();
        packet[4..6].copy_from_slice(&32u16.to_be_bytes());

        let err = decode(&packet).unwrap_err();
        assert!(matches!(err, Error::Frame { .. }));
    }

    #[test]
    fn test_decode_rejects_oversized_packet_length() {
        let mut packet = encode(Operation::Message, 1, b"abc").to_vec();
        // Declare more bytes than the buffer holds.
        packet[0..4].copy_from_slice(&100u32.to_be_bytes());

        let err = decode(&packet).unwrap_err();
        assert!(matches!(err, Error::Frame { .. }));
    }

    #[test]
    fn test_decode_rejects_undersized_packet_length() {
        let mut packet = encode(Operation::Message, 1, b"abcdefgh").to_vec();
        // Declared length leaves a tail too short to be another frame.
        packet[0..4].copy_from_slice(&((HEADER_LEN + 2) as u32).to_be_bytes());

        let err = decode(&packet).unwrap_err();
        assert!(matches!(err, Error::Frame { .. }));
    }

    #[test]
    fn test_decode_rejects_packet_length_below_header() {
        let mut packet = encode(Operation::Message, 1, b"").to_vec();
        packet[0..4].copy_from_slice(&4u32.to_be_bytes());

        let err = decode(&packet).unwrap_err();
        assert!(matches!(err, Error::Frame { .. }));
    }

    #[test]
    fn test_decode_concatenated_plain_frames() {
        let mut buf = encode(Operation::Message, 1, b"first").to_vec();
        buf.extend_from_slice(&encode(Operation::Message, 2, b"second"));

        let frames = decode(&buf).expect("decode");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].body(), b"first");
        assert_eq!(frames[1].body(), b"second");
    }

    #[test]
    fn test_decode_zlib_container_preserves_order() {
        let mut inner = Vec::new();
        for (seq, body) in [(1u32, &b"one"[..]), (2, b"two"), (3, b"three")] {
            inner.extend_from_slice(&encode(Operation::Message, seq, body));
        }

        let packet = raw_packet(2, 5, 0, &zlib_compress(&inner));

        let frames = decode(&packet).expect("decode");
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].body(), b"one");
        assert_eq!(frames[1].body(), b"two");
        assert_eq!(frames[2].body(), b"three");
        assert_eq!(
            frames.iter().map(Frame::sequence_id).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_decode_brotli_container() {
        let mut inner = encode(Operation::Message, 1, b"{\"cmd\":\"A\"}").to_vec();
        inner.extend_from_slice(&encode(Operation::Message, 2, b"{\"cmd\":\"B\"}"));

        let packet = raw_packet(3, 5, 0, &brotli_compress(&inner));

        let frames = decode(&packet).expect("decode");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].body(), b"{\"cmd\":\"A\"}");
        assert_eq!(frames[1].body(), b"{\"cmd\":\"B\"}");
    }

    #[test]
    fn test_decode_corrupt_zlib_is_decompress_error() {
        let packet = raw_packet(2, 5, 0, b"not actually zlib data");

        let err = decode(&packet).unwrap_err();
        assert!(matches!(err, Error::Decompress { .. }));
    }

    #[test]
    fn test_decode_unknown_version_passes_body_through() {
        let packet = raw_packet(9, 5, 1, b"opaque");

        let frames = decode(&packet).expect("decode");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].version(), ProtocolVersion::Unknown(9));
        assert_eq!(frames[0].body(), b"opaque");
    }

    #[test]
    fn test_decode_rejects_runaway_nesting() {
        // A container whose inflated content is itself the same container,
        // repeated past the depth limit.
        let innermost = encode(Operation::Message, 1, b"x").to_vec();
        let mut packet = innermost;
        for _ in 0..MAX_NESTING + 1 {
            packet = raw_packet(2, 5, 0, &zlib_compress(&packet));
        }

        let err = decode(&packet).unwrap_err();
        assert!(matches!(err, Error::Frame { .. }));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_frame(
            op in prop::sample::select(vec![2u32, 3, 5, 7, 8, 11]),
            seq in any::<u32>(),
            body in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            let packet = encode(Operation::from_wire(op), seq, &body);
            let frames = decode(&packet).expect("decode");

            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(frames[0].operation().to_wire(), op);
            prop_assert_eq!(frames[0].sequence_id(), seq);
            prop_assert_eq!(frames[0].body(), &body[..]);
        }

        #[test]
        fn prop_decode_never_panics(buf in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = decode(&buf);
        }
    }
}
