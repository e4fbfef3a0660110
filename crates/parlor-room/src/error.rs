//! Error types for the room layer.

use parlor_protocol::{PlayerId, RoomId};

/// Errors returned to callers of [`RoomHandle`](crate::RoomHandle) and
/// [`RoomManager`](crate::RoomManager).
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// No more initial or spectator slots.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomId),

    /// The room's status does not allow this operation, e.g. adding a bot
    /// to a match that already started.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The room actor has stopped (disposed or torn down).
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

/// Why a seat's command was refused.
///
/// Rejections never change match state and are reported only to the seat
/// that sent the command, as an `error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("match is not in progress")]
    NotInProgress,

    #[error("match has already started")]
    AlreadyStarted,

    #[error("seat {0} is not in this room")]
    NotSeated(PlayerId),

    #[error("spectators cannot {0}")]
    Spectator(&'static str),

    #[error("seat {0} has forfeited")]
    Forfeited(PlayerId),

    #[error("not your turn")]
    NotYourTurn,

    #[error("waiting for {0} to respond")]
    AwaitingResponse(PlayerId),

    #[error("waiting for {0} to pay")]
    AwaitingPayment(PlayerId),

    /// The sender is the active responder and must answer with `respond`.
    #[error("a response to the pending action is expected")]
    ResponseExpected,

    #[error("there is no pending action to respond to")]
    NothingPending,

    #[error("no counter available")]
    NoCounter,

    /// The rules strategy refused the move.
    #[error("illegal move: {0}")]
    Illegal(String),

    #[error("chat message must be 1-{0} characters")]
    BadChat(usize),
}
