//! Unified error type for the Parlor framework.

use parlor_protocol::ProtocolError;
use parlor_room::RoomError;

/// Top-level error wrapping the crate-specific errors, so callers of the
/// `parlor` facade deal with one type and `?` converts the rest.
#[derive(Debug, thiserror::Error)]
pub enum ParlorError {
    /// Encode, decode, or invalid frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Room full, not found, stopped, or in the wrong state.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A global tracing subscriber could not be installed.
    #[error("telemetry setup failed: {0}")]
    Telemetry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Protocol(_)));
        assert!(parlor_err.to_string().contains("bad"));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(parlor_protocol::RoomId(1));
        let parlor_err: ParlorError = err.into();
        assert!(matches!(parlor_err, ParlorError::Room(_)));
        assert_eq!(parlor_err.to_string(), "room R-1 not found");
    }
}
