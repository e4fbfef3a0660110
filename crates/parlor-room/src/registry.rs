//! Seat records for one room.
//!
//! A [`Player`] is created the first time a seat joins and then kept for the
//! life of the room: disconnects only flip `is_connected`, and a returning
//! seat picks up the same record. Only a consented leave removes it.

use std::collections::HashMap;

use parlor_protocol::{JoinOptions, PlayerId};
use rand::Rng;
use serde::Serialize;

use crate::record::Participant;

/// Errors from [`PlayerRegistry`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatError {
    #[error("seat {0} already has a record")]
    AlreadySeated(PlayerId),

    #[error("seat {0} has no record")]
    NotSeated(PlayerId),

    /// Initial players are fixed once the match started.
    #[error("initial players are sealed")]
    Sealed,
}

/// How a new seat takes part in the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatKind {
    /// Takes turns. Only possible before the match starts.
    Initial,
    /// Observes and chats; never takes a turn.
    Spectator,
}

/// A seat's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub identity: String,
    pub display_name: String,
    pub is_bot: bool,
    pub is_connected: bool,
    pub is_spectator: bool,
    /// Fixed when the match starts; never recomputed.
    pub was_initial_player: bool,
    pub ready: bool,
    #[serde(skip)]
    reconnect_token: String,
}

impl Player {
    pub fn reconnect_token(&self) -> &str {
        &self.reconnect_token
    }

    fn participant(&self) -> Participant {
        Participant {
            seat: self.id,
            identity: self.identity.clone(),
            display_name: self.display_name.clone(),
            is_bot: self.is_bot,
        }
    }
}

/// All seat records of one room, in join order.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerId, Player>,
    order: Vec<PlayerId>,
    tokens: HashMap<String, PlayerId>,
    initial: Vec<PlayerId>,
    sealed: bool,
    /// Initial players who left after the match started. Kept for history.
    departed: Vec<Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record for a new seat.
    ///
    /// Fails if the seat already has one (callers reconnect instead) or if
    /// an initial seat is requested after [`seal`](Self::seal).
    pub fn join(
        &mut self,
        seat: PlayerId,
        options: &JoinOptions,
        kind: SeatKind,
        is_bot: bool,
    ) -> Result<&Player, SeatError> {
        if self.players.contains_key(&seat) {
            return Err(SeatError::AlreadySeated(seat));
        }
        if kind == SeatKind::Initial && self.sealed {
            return Err(SeatError::Sealed);
        }

        let display_name = options
            .display_name
            .clone()
            .unwrap_or_else(|| format!("Player {}", seat.0));
        let identity = options.identity.clone().unwrap_or_else(|| {
            if is_bot {
                format!("bot:{display_name}")
            } else {
                format!("seat:{}", seat.0)
            }
        });
        let token = generate_token();

        let player = Player {
            id: seat,
            identity,
            display_name,
            is_bot,
            is_connected: true,
            is_spectator: kind == SeatKind::Spectator,
            was_initial_player: false,
            ready: is_bot,
            reconnect_token: token.clone(),
        };

        self.tokens.insert(token, seat);
        self.order.push(seat);
        if kind == SeatKind::Initial {
            self.initial.push(seat);
        }
        Ok(self.players.entry(seat).or_insert(player))
    }

    /// Marks a returning seat connected. Returns `true` if it had been
    /// disconnected.
    pub fn reconnect(&mut self, seat: PlayerId) -> Result<bool, SeatError> {
        let player = self.players.get_mut(&seat).ok_or(SeatError::NotSeated(seat))?;
        let was_disconnected = !player.is_connected;
        player.is_connected = true;
        Ok(was_disconnected)
    }

    pub fn disconnect(&mut self, seat: PlayerId) -> Result<(), SeatError> {
        let player = self.players.get_mut(&seat).ok_or(SeatError::NotSeated(seat))?;
        player.is_connected = false;
        Ok(())
    }

    pub fn set_ready(&mut self, seat: PlayerId) -> Result<bool, SeatError> {
        let player = self.players.get_mut(&seat).ok_or(SeatError::NotSeated(seat))?;
        let changed = !player.ready;
        player.ready = true;
        Ok(changed)
    }

    /// Removes a seat's record. Before the seal this also withdraws it from
    /// the initial players; after, the record is kept for history.
    pub fn remove(&mut self, seat: PlayerId) -> Option<Player> {
        let player = self.players.remove(&seat)?;
        self.tokens.remove(&player.reconnect_token);
        self.order.retain(|id| *id != seat);
        if self.sealed {
            if player.was_initial_player {
                self.departed.push(player.clone());
            }
        } else {
            self.initial.retain(|id| *id != seat);
        }
        Some(player)
    }

    /// Fixes the initial players and returns them in join order.
    pub fn seal(&mut self) -> Vec<PlayerId> {
        self.sealed = true;
        for seat in &self.initial {
            if let Some(player) = self.players.get_mut(seat) {
                player.was_initial_player = true;
            }
        }
        self.initial.clone()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn get(&self, seat: PlayerId) -> Option<&Player> {
        self.players.get(&seat)
    }

    pub fn contains(&self, seat: PlayerId) -> bool {
        self.players.contains_key(&seat)
    }

    pub fn seat_for_token(&self, token: &str) -> Option<PlayerId> {
        self.tokens.get(token).copied()
    }

    /// Initial players in join order. Complete only after the seal.
    pub fn initial_players(&self) -> &[PlayerId] {
        &self.initial
    }

    pub fn is_initial(&self, seat: PlayerId) -> bool {
        self.initial.contains(&seat)
    }

    pub fn initial_count(&self) -> usize {
        self.initial.len()
    }

    pub fn spectator_count(&self) -> usize {
        self.players.values().filter(|p| p.is_spectator).count()
    }

    pub fn human_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_bot).count()
    }

    /// Whether every initial seat has signalled ready.
    pub fn all_initial_ready(&self) -> bool {
        self.initial
            .iter()
            .all(|seat| self.players.get(seat).is_some_and(|p| p.ready))
    }

    /// Every record in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.order.iter().filter_map(|seat| self.players.get(seat))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Initial players for match history, including those who left.
    pub fn participants(&self) -> Vec<Participant> {
        self.initial
            .iter()
            .filter_map(|seat| {
                self.players
                    .get(seat)
                    .or_else(|| self.departed.iter().find(|p| p.id == *seat))
            })
            .map(Player::participant)
            .collect()
    }
}

/// Generates a random reconnect token: 16 random bytes as lowercase hex.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
