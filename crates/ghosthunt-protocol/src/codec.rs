//! Codec trait and implementations for push frames.
//!
//! The push handler and the room fan-out never call `serde_json`
//! directly; they go through a [`Codec`] so the frame format stays a
//! single decision.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts wire types to frame bytes and back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task for the life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match `T`.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidMessage` if the encoding is not
    /// UTF-8.
    fn encode_text<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes)
            .map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. Browser clients speak JSON, so
/// this is the only codec the server uses.
///
/// ```rust
/// use ghosthunt_protocol::{Codec, GameRequest, JsonCodec};
///
/// let codec = JsonCodec;
/// let req: GameRequest = codec.decode(br#"{"command":"vote","meta":"Bob"}"#).unwrap();
/// assert_eq!(req.meta, "Bob");
///
/// let text = codec.encode_text(&req).unwrap();
/// assert!(text.contains("\"vote\""));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }

    fn encode_text<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }
}
