//! Room manager: creates, tracks, and routes seats to rooms.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_protocol::{Command, JoinOptions, PlayerId, RoomId};

use crate::bot::BotAgent;
use crate::record::{MatchRecorder, TracingRecorder};
use crate::room::spawn_room;
use crate::{JoinAck, MatchSnapshot, RoomError, RoomHandle, RoomInfo, RulesStrategy, SeatSender};

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Owns every live room of one game type and knows which room each seat
/// is in. A seat is in at most one room at a time.
///
/// Room ids come from a counter owned by the manager, so independent
/// managers (and tests) never share state.
pub struct RoomManager<G: RulesStrategy> {
    rooms: HashMap<RoomId, RoomHandle<G>>,
    player_rooms: HashMap<PlayerId, RoomId>,
    recorder: Arc<dyn MatchRecorder>,
    next_room_id: u64,
    channel_size: usize,
}

impl<G: RulesStrategy> RoomManager<G> {
    /// Creates a manager whose rooms report results to `recorder`.
    pub fn new(recorder: Arc<dyn MatchRecorder>) -> Self {
        Self {
            rooms: HashMap::new(),
            player_rooms: HashMap::new(),
            recorder,
            next_room_id: 1,
            channel_size: DEFAULT_CHANNEL_SIZE,
        }
    }

    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size.max(1);
        self
    }

    /// Spawns a new room and returns its id.
    pub fn create_room(&mut self, rules: G, game_config: G::Config) -> RoomId {
        let room_id = RoomId(self.next_room_id);
        self.next_room_id += 1;
        let game_type = rules.game_type().to_string();
        let handle = spawn_room(
            room_id,
            rules,
            game_config,
            Arc::clone(&self.recorder),
            self.channel_size,
        );
        self.rooms.insert(room_id, handle);
        tracing::info!(%room_id, %game_type, "room created");
        room_id
    }

    /// Joins (or rejoins) a seat to a room.
    ///
    /// A seat already placed in a different room is refused.
    pub async fn join_room(
        &mut self,
        seat: PlayerId,
        room_id: RoomId,
        options: JoinOptions,
        sender: SeatSender<G>,
    ) -> Result<JoinAck, RoomError> {
        if let Some(current) = self.player_rooms.get(&seat) {
            if *current != room_id {
                return Err(RoomError::InvalidState(format!(
                    "player {seat} is already in room {current}"
                )));
            }
        }

        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        let ack = handle.join(seat, options, sender).await?;
        self.player_rooms.insert(ack.seat, room_id);
        Ok(ack)
    }

    /// Seats a bot in a waiting room.
    pub async fn add_bot(
        &mut self,
        room_id: RoomId,
        seat: PlayerId,
        name: impl Into<String>,
        agent: Box<dyn BotAgent<G>>,
    ) -> Result<(), RoomError> {
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        handle.add_bot(seat, name, agent).await
    }

    /// Removes a seat from its room. Without consent the seat is only
    /// marked disconnected and stays mapped to the room, so it can rejoin.
    pub async fn leave_room(&mut self, seat: PlayerId, consented: bool) -> Result<(), RoomError> {
        let room_id = self.player_rooms.get(&seat).copied().ok_or_else(|| {
            RoomError::InvalidState(format!("player {seat} is not in any room"))
        })?;

        if let Some(handle) = self.rooms.get(&room_id) {
            handle.leave(seat, consented).await?;
        }
        if consented {
            self.player_rooms.remove(&seat);
        }
        Ok(())
    }

    /// Routes a seat's command to its current room.
    pub async fn route_command(
        &self,
        seat: PlayerId,
        command: Command<G::Move>,
    ) -> Result<(), RoomError> {
        let room_id = self.player_rooms.get(&seat).ok_or_else(|| {
            RoomError::InvalidState(format!("player {seat} is not in any room"))
        })?;
        let handle = self.rooms.get(room_id).ok_or(RoomError::NotFound(*room_id))?;
        handle.submit(seat, command).await
    }

    pub async fn room_info(&self, room_id: RoomId) -> Result<RoomInfo, RoomError> {
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        handle.info().await
    }

    pub async fn snapshot(&self, room_id: RoomId) -> Result<MatchSnapshot<G::State>, RoomError> {
        let handle = self.rooms.get(&room_id).ok_or(RoomError::NotFound(room_id))?;
        handle.snapshot().await
    }

    /// Rooms still accepting initial players, in id order.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut handles: Vec<_> = self.rooms.values().cloned().collect();
        handles.sort_by_key(|h| h.room_id().0);

        let mut listed = Vec::with_capacity(handles.len());
        for handle in &handles {
            if let Ok(info) = handle.info().await {
                if info.status.is_joinable() && info.player_count < info.max_players {
                    listed.push(info);
                }
            }
        }
        listed
    }

    /// Disposes a room and forgets every seat that was in it.
    pub async fn destroy_room(&mut self, room_id: RoomId) -> Result<(), RoomError> {
        let handle = self.rooms.remove(&room_id).ok_or(RoomError::NotFound(room_id))?;
        // Already stopped is fine: the goal is that it is gone.
        let _ = handle.dispose().await;
        self.player_rooms.retain(|_, rid| *rid != room_id);
        tracing::info!(%room_id, "room destroyed");
        Ok(())
    }

    /// Forgets rooms whose actor has stopped (torn down after a finished
    /// match, or emptied before the start). Returns their ids.
    pub fn prune_closed(&mut self) -> Vec<RoomId> {
        let closed: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|(_, handle)| handle.is_closed())
            .map(|(id, _)| *id)
            .collect();
        for room_id in &closed {
            self.rooms.remove(room_id);
            self.player_rooms.retain(|_, rid| rid != room_id);
        }
        if !closed.is_empty() {
            tracing::debug!(count = closed.len(), "pruned closed rooms");
        }
        closed
    }

    pub fn player_room(&self, seat: PlayerId) -> Option<RoomId> {
        self.player_rooms.get(&seat).copied()
    }

    pub fn room_handle(&self, room_id: RoomId) -> Option<RoomHandle<G>> {
        self.rooms.get(&room_id).cloned()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }
}

impl<G: RulesStrategy> Default for RoomManager<G> {
    /// A manager that logs results instead of storing them.
    fn default() -> Self {
        Self::new(Arc::new(TracingRecorder))
    }
}
