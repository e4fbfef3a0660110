//! Error types for the protocol layer.

/// Errors raised while turning frames into bytes and back.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A value could not be serialized.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Bytes could not be parsed into the expected frame: malformed JSON,
    /// a missing field, or an unknown `type` tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
