//! Wire protocol: frame layout, packet codec, handshake bodies.
//!
//! Every packet on the wire is a 16-byte big-endian header followed by a
//! body. Message bodies may arrive zlib- or brotli-compressed; a compressed
//! body is itself a sequence of concatenated frames, which the codec unwraps
//! recursively.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Frame/header types, operation and version codes |
//! | `codec` | Packet encode/decode with transparent decompression |
//! | `handshake` | Handshake request payload and ack parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Frame and header types.
pub mod frame;

/// Packet encoding and decoding.
pub mod codec;

/// Handshake request payload and ack.
pub mod handshake;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{decode, encode};
pub use frame::{Frame, HEADER_LEN, Header, Operation, ProtocolVersion};
pub use handshake::{HandshakeAck, HandshakePayload, REQUESTED_PROTOCOL_VERSION};
