//! # Parlor
//!
//! Server-authoritative match rooms for turn-based multiplayer games.
//!
//! A game implements one trait, [`RulesStrategy`](prelude::RulesStrategy):
//! validation, application, win checks, and optionally counters, debts, and
//! a default move for bots. Parlor owns everything else: seating and
//! reconnects, turn rotation, the pending-action stack, bot timing, match
//! recording, and teardown.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use parlor::prelude::*;
//!
//! let mut rooms = RoomManager::<MyGame>::default();
//! let room_id = rooms.create_room(MyGame, MyConfig::default());
//! let gateway = Gateway::new(rooms);
//!
//! // per connection:
//! let (mut link, mut outbound) = gateway.attach(PlayerId(7));
//! if let Some(reply) = link.inbound(&frame_bytes).await? {
//!     socket.send(reply).await?;
//! }
//! ```

mod error;
mod gateway;
mod telemetry;

pub use error::ParlorError;
pub use gateway::{Gateway, SeatLink};
pub use telemetry::init_tracing;

/// Everything a game implementation and its host usually need.
pub mod prelude {
    pub use crate::{init_tracing, Gateway, ParlorError, SeatLink};
    pub use parlor_protocol::{
        ActionId, ActionKind, ActionStatus, ClientEnvelope, ClientFrame, Codec, Command, Debt,
        EndReason, Event, JoinOptions, JsonCodec, PendingAction, Phase, PlayerId, ProtocolError,
        Recipient, Response, RoomId, ServerEnvelope, ServerFrame,
    };
    pub use parlor_room::{
        settles, Applied, BotAgent, BotError, BotMove, BotView, Contingent, Effect, JoinAck,
        MatchRecord, MatchRecorder, MatchSnapshot, MatchStatus, MatchView, MemoryRecorder,
        Outbound, Participant, RecordError, Resolution, RoomConfig, RoomError, RoomHandle,
        RoomInfo, RoomManager, RulesStrategy, SeatSender, StartPolicy, ThinkDelay,
        TracingRecorder, Verdict,
    };
}
