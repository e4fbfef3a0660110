//! Match rooms for Parlor.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns one
//! match: its seats, turn rotation, pending-action stack, debts, and bots.
//!
//! # Key types
//!
//! - [`RulesStrategy`]: the trait each game implements
//! - [`RoomManager`]: creates rooms and routes seats to them
//! - [`RoomHandle`]: talks to one running room
//! - [`BotAgent`]: a move-choosing policy for a bot seat
//! - [`MatchRecorder`]: where finished-match results go
//! - [`MatchStatus`] / [`RoomConfig`]: lifecycle and settings

mod bot;
mod config;
mod error;
mod manager;
mod record;
mod registry;
mod room;
mod rules;
mod stack;
mod turn;

pub use bot::{BotAgent, BotError, BotMove, BotScheduler, BotTicket, BotView};
pub use config::{MatchStatus, RoomConfig, StartPolicy};
pub use error::{Rejection, RoomError};
pub use manager::RoomManager;
pub use record::{
    MatchRecord, MatchRecorder, MemoryRecorder, Participant, RecordError, TracingRecorder,
};
pub use registry::{Player, PlayerRegistry, SeatError, SeatKind};
pub use room::{
    spawn_room, JoinAck, MatchSnapshot, Outbound, RoomHandle, RoomInfo, SeatSender, MAX_CHAT_LEN,
};
pub use rules::{Applied, Contingent, Effect, MatchView, Resolution, RulesStrategy, Verdict};
pub use stack::{settles, Origin, PendingActionStack, Resolved, StackError};
pub use turn::{TurnScheduler, LOBBY_PHASE};

pub use parlor_timer::ThinkDelay;
