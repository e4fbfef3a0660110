//! Byte codecs for frames.
//!
//! Rooms never see bytes. The gateway decodes inbound frames with a
//! [`Codec`] and encodes outbound ones with the same codec, so swapping
//! JSON for a binary format touches nothing else.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Converts frames to bytes and back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Parses bytes into an owned value.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// [`Codec`] backed by `serde_json`. Enabled by the default `json` feature.
///
/// ```rust
/// use parlor_protocol::{ClientEnvelope, ClientFrame, Codec, Command, JsonCodec};
///
/// let codec = JsonCodec;
/// let env: ClientEnvelope<u32> = ClientEnvelope {
///     seq: 1,
///     frame: ClientFrame::Command { command: Command::Move { payload: 3 } },
/// };
/// let bytes = codec.encode(&env).unwrap();
/// let back: ClientEnvelope<u32> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, env);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
