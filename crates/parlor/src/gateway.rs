//! Transport-agnostic gateway: bytes in, bytes out.
//!
//! A transport (WebSocket, TCP, an in-process test harness) owns the
//! connection. For each connection it calls [`Gateway::attach`], feeds every
//! inbound frame to [`SeatLink::inbound`], writes whatever that returns, and
//! drains the outbound receiver through [`SeatLink::encode`]. On a network
//! drop it calls [`SeatLink::disconnected`] so the seat can come back later.
//!
//! ```text
//! bytes ─▶ SeatLink::inbound ─▶ RoomManager ─▶ MatchRoom
//! bytes ◀─ SeatLink::encode  ◀─ Outbound    ◀─┘
//! ```

use std::sync::Arc;
use std::time::Instant;

use parlor_protocol::{
    ClientEnvelope, ClientFrame, Codec, JsonCodec, PlayerId, RoomId, ServerEnvelope, ServerFrame,
};
use parlor_room::{MatchSnapshot, Outbound, RoomError, RoomManager, RulesStrategy};
use tokio::sync::{mpsc, Mutex};

use crate::ParlorError;

type Frame<G> =
    ServerFrame<MatchSnapshot<<G as RulesStrategy>::State>, <G as RulesStrategy>::Event>;

/// Shared gateway state. One per game type per process.
struct Shared<G: RulesStrategy, C: Codec> {
    rooms: Mutex<RoomManager<G>>,
    codec: C,
    started: Instant,
}

/// Entry point for transports. Cheap to clone.
pub struct Gateway<G: RulesStrategy, C: Codec = JsonCodec> {
    shared: Arc<Shared<G, C>>,
}

impl<G: RulesStrategy, C: Codec> Clone for Gateway<G, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G: RulesStrategy> Gateway<G, JsonCodec> {
    /// A JSON gateway over `rooms`.
    pub fn new(rooms: RoomManager<G>) -> Self {
        Self::with_codec(rooms, JsonCodec)
    }
}

impl<G: RulesStrategy, C: Codec> Gateway<G, C> {
    pub fn with_codec(rooms: RoomManager<G>, codec: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                rooms: Mutex::new(rooms),
                codec,
                started: Instant::now(),
            }),
        }
    }

    /// The room manager behind the gateway, for creating rooms and seating
    /// bots outside of client traffic.
    pub fn rooms(&self) -> &Mutex<RoomManager<G>> {
        &self.shared.rooms
    }

    /// Opens a link for a new connection speaking for `seat`. Outbound room
    /// traffic for the seat arrives on the returned receiver.
    pub fn attach(&self, seat: PlayerId) -> (SeatLink<G, C>, mpsc::UnboundedReceiver<Outbound<G>>) {
        let (sender, outbound) = mpsc::unbounded_channel();
        tracing::debug!(%seat, "seat attached");
        let link = SeatLink {
            seat,
            shared: Arc::clone(&self.shared),
            sender,
            seq: 1,
        };
        (link, outbound)
    }
}

/// One connection's view of the gateway.
pub struct SeatLink<G: RulesStrategy, C: Codec = JsonCodec> {
    seat: PlayerId,
    shared: Arc<Shared<G, C>>,
    sender: mpsc::UnboundedSender<Outbound<G>>,
    seq: u64,
}

impl<G: RulesStrategy, C: Codec> SeatLink<G, C> {
    /// The seat this connection speaks for. Changes when a reconnect token
    /// resumes an earlier seat.
    pub fn seat(&self) -> PlayerId {
        self.seat
    }

    /// Handles one inbound frame. Returns bytes to write back immediately
    /// (a join acknowledgement or a connection-level error), if any.
    ///
    /// Only encoding failures are errors; everything the client got wrong
    /// is answered with an error frame.
    pub async fn inbound(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, ParlorError> {
        let envelope: ClientEnvelope<G::Move> = match self.shared.codec.decode(data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(seat = %self.seat, error = %e, "failed to decode frame");
                return self.error(400, &e.to_string()).map(Some);
            }
        };

        match envelope.frame {
            ClientFrame::Join { room_id, options } => {
                let result = {
                    let mut rooms = self.shared.rooms.lock().await;
                    rooms
                        .join_room(self.seat, room_id, options, self.sender.clone())
                        .await
                };
                match result {
                    Ok(ack) => {
                        if ack.seat != self.seat {
                            tracing::info!(
                                from = %self.seat,
                                to = %ack.seat,
                                "connection resumed an earlier seat"
                            );
                            self.seat = ack.seat;
                        }
                        let frame = ServerFrame::Joined {
                            room_id: ack.room_id,
                            seat: ack.seat,
                            reconnect_token: ack.reconnect_token,
                            spectator: ack.spectator,
                        };
                        self.frame(frame).map(Some)
                    }
                    Err(e) => self.room_error(room_id, &e).map(Some),
                }
            }
            ClientFrame::Leave => {
                let result = self.shared.rooms.lock().await.leave_room(self.seat, true).await;
                match result {
                    Ok(()) => Ok(None),
                    Err(e) => self.error(error_code(&e), &e.to_string()).map(Some),
                }
            }
            ClientFrame::Command { command } => {
                let result = self
                    .shared
                    .rooms
                    .lock()
                    .await
                    .route_command(self.seat, command)
                    .await;
                match result {
                    Ok(()) => Ok(None),
                    Err(e) => self.error(error_code(&e), &e.to_string()).map(Some),
                }
            }
        }
    }

    /// Wraps one outbound room message in a sequenced envelope.
    pub fn encode(&mut self, msg: Outbound<G>) -> Result<Vec<u8>, ParlorError> {
        let frame: Frame<G> = match msg {
            Outbound::Snapshot(snapshot) => ServerFrame::Snapshot { snapshot: *snapshot },
            Outbound::Event(event) => ServerFrame::Event { event },
        };
        self.frame(frame)
    }

    /// The transport lost the connection. The seat keeps its place and may
    /// rejoin; a seat not in any room is ignored.
    pub async fn disconnected(&self) {
        let mut rooms = self.shared.rooms.lock().await;
        if rooms.player_room(self.seat).is_none() {
            return;
        }
        if let Err(e) = rooms.leave_room(self.seat, false).await {
            tracing::debug!(seat = %self.seat, error = %e, "disconnect failed");
        }
    }

    fn room_error(&mut self, room_id: RoomId, err: &RoomError) -> Result<Vec<u8>, ParlorError> {
        tracing::debug!(seat = %self.seat, %room_id, error = %err, "join refused");
        self.error(error_code(err), &err.to_string())
    }

    fn error(&mut self, code: u16, message: &str) -> Result<Vec<u8>, ParlorError> {
        self.frame(ServerFrame::Error {
            code,
            message: message.to_string(),
        })
    }

    fn frame(&mut self, body: Frame<G>) -> Result<Vec<u8>, ParlorError> {
        let envelope = ServerEnvelope {
            seq: next_seq(&mut self.seq),
            timestamp: self.shared.started.elapsed().as_millis() as u64,
            body,
        };
        Ok(self.shared.codec.encode(&envelope)?)
    }
}

/// HTTP-flavoured status code for a room error.
fn error_code(err: &RoomError) -> u16 {
    match err {
        RoomError::NotFound(_) | RoomError::NotInRoom(..) => 404,
        RoomError::RoomFull(_) | RoomError::AlreadyInRoom(..) | RoomError::InvalidState(_) => 409,
        RoomError::Unavailable(_) => 410,
    }
}

/// Increments and returns the next sequence number.
fn next_seq(seq: &mut u64) -> u64 {
    let current = *seq;
    *seq += 1;
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_seq_increments() {
        let mut seq = 1;
        assert_eq!(next_seq(&mut seq), 1);
        assert_eq!(next_seq(&mut seq), 2);
        assert_eq!(seq, 3);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(error_code(&RoomError::NotFound(RoomId(1))), 404);
        assert_eq!(error_code(&RoomError::RoomFull(RoomId(1))), 409);
        assert_eq!(error_code(&RoomError::Unavailable(RoomId(1))), 410);
        assert_eq!(error_code(&RoomError::InvalidState("x".into())), 409);
    }
}
