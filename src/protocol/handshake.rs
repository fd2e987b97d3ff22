//! Handshake request payload and ack.
//!
//! The first frame on every connection carries a JSON auth payload
//! (operation 7); the server answers with `{code: int}` (operation 8).
//! Code 0 authenticates the session; anything else is a rejection.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Highest body encoding this client asks the server to use.
///
/// 3 requests brotli containers; servers that predate brotli fall back to
/// zlib, and the decoder handles both regardless.
pub const REQUESTED_PROTOCOL_VERSION: u16 = 3;

// ============================================================================
// HandshakePayload
// ============================================================================

/// JSON body of the handshake request frame.
///
/// # Format
///
/// ```json
/// {
///   "uid": 0,
///   "roomid": 23058,
///   "protover": 3,
///   "platform": "web",
///   "type": 2,
///   "key": "<auth token from the resolver>"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct HandshakePayload {
    /// User id; 0 for an anonymous session.
    pub uid: u64,

    /// The real (long) room id.
    #[serde(rename = "roomid")]
    pub room_id: u64,

    /// Highest body encoding the client understands.
    #[serde(rename = "protover")]
    pub protocol_version: u16,

    /// Client platform tag.
    pub platform: String,

    /// Handshake type discriminator expected by the server.
    #[serde(rename = "type")]
    pub handshake_type: u32,

    /// Auth token obtained from the server address resolver.
    pub key: String,
}

impl HandshakePayload {
    /// Creates a payload for `room_id` authenticated by `key`.
    #[must_use]
    pub fn new(uid: u64, room_id: u64, key: impl Into<String>) -> Self {
        Self {
            uid,
            room_id,
            protocol_version: REQUESTED_PROTOCOL_VERSION,
            platform: "web".to_string(),
            handshake_type: 2,
            key: key.into(),
        }
    }

    /// Serializes the payload to its JSON body bytes.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Json`] if serialization fails.
    pub fn to_body(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

// ============================================================================
// HandshakeAck
// ============================================================================

/// Parsed handshake ack body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HandshakeAck {
    /// Server result code; 0 means authenticated.
    pub code: i64,
}

impl HandshakeAck {
    /// Parses an ack from a frame body.
    ///
    /// # Errors
    ///
    /// [`crate::Error::Json`] if the body is not a valid ack object.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Returns `true` if the server accepted the handshake.
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
