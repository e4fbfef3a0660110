//! Match room actor: an isolated Tokio task that owns one match.
//!
//! Every input (seat commands, joins and leaves, bot timers, teardown) is a
//! message processed one at a time on the actor's task, so state is never
//! shared and never locked. Commands and timer firings arrive on two
//! channels; the loop polls commands first, so a command that was queued
//! before a timer fired is handled before it.
//!
//! ```text
//! RoomHandle ──RoomCommand──▶ ┌───────────┐ ──Outbound──▶ seat senders
//!                             │ MatchRoom │
//! TimerSet ────Fired────────▶ └───────────┘ ──MatchRecord──▶ MatchRecorder
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parlor_protocol::{
    Command, Debt, EndReason, Event, JoinOptions, PendingAction, Phase, PlayerId, Recipient,
    Response, RoomId,
};
use parlor_timer::{Fired, TimerSet};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::bot::{BotAgent, BotScheduler, BotView};
use crate::record::{MatchRecord, MatchRecorder};
use crate::registry::{Player, PlayerRegistry, SeatError, SeatKind};
use crate::rules::{Effect, MatchView, RulesStrategy, Verdict};
use crate::stack::{PendingActionStack, Resolved};
use crate::turn::TurnScheduler;
use crate::{MatchStatus, Rejection, RoomConfig, RoomError, StartPolicy};

/// Longest chat message accepted, in characters.
pub const MAX_CHAT_LEN: usize = 500;

/// Timers a room schedules. At most one of each is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum RoomTimer {
    Bot,
    Teardown,
    /// No initial seat has joined yet.
    Idle,
}

// ---------------------------------------------------------------------------
// Public message types
// ---------------------------------------------------------------------------

/// Everything a room delivers to a seat's connection.
pub enum Outbound<G: RulesStrategy> {
    /// Full match state, sent on join, reconnect, and match start.
    Snapshot(Box<MatchSnapshot<G::State>>),
    Event(Event<G::Event>),
}

impl<G: RulesStrategy> Clone for Outbound<G> {
    fn clone(&self) -> Self {
        match self {
            Self::Snapshot(s) => Self::Snapshot(s.clone()),
            Self::Event(e) => Self::Event(e.clone()),
        }
    }
}

impl<G: RulesStrategy> std::fmt::Debug for Outbound<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snapshot(s) => f.debug_tuple("Snapshot").field(s).finish(),
            Self::Event(e) => f.debug_tuple("Event").field(e).finish(),
        }
    }
}

/// Channel sender for delivering outbound messages to one seat.
pub type SeatSender<G> = mpsc::UnboundedSender<Outbound<G>>;

/// The full state of a match as one seat sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSnapshot<S> {
    pub room_id: RoomId,
    pub game_type: String,
    pub status: MatchStatus,
    pub phase: Phase,
    pub current_turn: Option<PlayerId>,
    /// The only seat whose move would be accepted right now.
    pub acting: Option<PlayerId>,
    pub turn_number: u64,
    pub turn_started_at_ms: Option<u64>,
    pub winner: Option<PlayerId>,
    pub is_draw: bool,
    pub players: Vec<Player>,
    pub initial_players: Vec<PlayerId>,
    /// Pending-action stack, bottom first.
    pub pending: Vec<PendingAction>,
    pub responder: Option<PlayerId>,
    pub debts: Vec<Debt>,
    /// Game state; `None` until the match starts.
    pub state: Option<S>,
}

/// Room metadata (not the match itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub game_type: String,
    pub status: MatchStatus,
    pub player_count: usize,
    pub spectator_count: usize,
    pub bot_count: usize,
    pub max_players: usize,
}

/// Reply to a successful join or reconnect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAck {
    pub room_id: RoomId,
    /// The seat the connection now speaks for. Differs from the requested
    /// one when a reconnect token resumed an earlier seat.
    pub seat: PlayerId,
    pub reconnect_token: String,
    pub spectator: bool,
    pub reconnected: bool,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand<G: RulesStrategy> {
    Join {
        seat: PlayerId,
        options: JoinOptions,
        sender: SeatSender<G>,
        reply: oneshot::Sender<Result<JoinAck, RoomError>>,
    },
    AddBot {
        seat: PlayerId,
        name: String,
        agent: Box<dyn BotAgent<G>>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        seat: PlayerId,
        consented: bool,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Fire-and-forget: rejections go back to the seat as an error event.
    Submit {
        seat: PlayerId,
        command: Command<G::Move>,
    },
    Snapshot {
        viewer: Option<PlayerId>,
        reply: oneshot::Sender<MatchSnapshot<G::State>>,
    },
    Info {
        reply: oneshot::Sender<RoomInfo>,
    },
    Dispose,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone. Once the actor stops, every call returns
/// [`RoomError::Unavailable`].
pub struct RoomHandle<G: RulesStrategy> {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand<G>>,
}

impl<G: RulesStrategy> Clone for RoomHandle<G> {
    fn clone(&self) -> Self {
        Self {
            room_id: self.room_id,
            sender: self.sender.clone(),
        }
    }
}

impl<G: RulesStrategy> RoomHandle<G> {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Joins a new seat, or resumes an existing one.
    pub async fn join(
        &self,
        seat: PlayerId,
        options: JoinOptions,
        sender: SeatSender<G>,
    ) -> Result<JoinAck, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            seat,
            options,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Seats a bot driven by `agent`. Only before the match starts.
    pub async fn add_bot(
        &self,
        seat: PlayerId,
        name: impl Into<String>,
        agent: Box<dyn BotAgent<G>>,
    ) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::AddBot {
            seat,
            name: name.into(),
            agent,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Removes a seat. A consented leave gives the seat up (and forfeits a
    /// running match); otherwise the seat is only marked disconnected.
    pub async fn leave(&self, seat: PlayerId, consented: bool) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            seat,
            consented,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Submits a seat's command. Rejections are delivered to the seat as
    /// `Event::Error`.
    pub async fn submit(&self, seat: PlayerId, command: Command<G::Move>) -> Result<(), RoomError> {
        self.send(RoomCommand::Submit { seat, command }).await
    }

    /// The unredacted match snapshot.
    pub async fn snapshot(&self) -> Result<MatchSnapshot<G::State>, RoomError> {
        self.request_snapshot(None).await
    }

    /// The snapshot as `seat` receives it.
    pub async fn snapshot_for(&self, seat: PlayerId) -> Result<MatchSnapshot<G::State>, RoomError> {
        self.request_snapshot(Some(seat)).await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Stops the room without recording a result.
    pub async fn dispose(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Dispose).await
    }

    async fn request_snapshot(
        &self,
        viewer: Option<PlayerId>,
    ) -> Result<MatchSnapshot<G::State>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { viewer, reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    async fn send(&self, cmd: RoomCommand<G>) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

// ---------------------------------------------------------------------------
// MatchRoom actor
// ---------------------------------------------------------------------------

struct MatchRoom<G: RulesStrategy> {
    room_id: RoomId,
    rules: G,
    game_config: G::Config,
    config: RoomConfig,
    registry: PlayerRegistry,
    turns: TurnScheduler,
    stack: PendingActionStack,
    bots: BotScheduler<G>,
    game_state: Option<G::State>,
    senders: HashMap<PlayerId, SeatSender<G>>,
    recorder: Arc<dyn MatchRecorder>,
    timers: TimerSet<RoomTimer>,
    fired: mpsc::UnboundedReceiver<Fired<RoomTimer>>,
    inbox: mpsc::Receiver<RoomCommand<G>>,
    /// Bumped on every applied mutation; bot tickets from an older epoch
    /// are stale.
    epoch: u64,
    disposed: bool,
}

/// Builds the rules-facing view from the room-owned state.
fn match_view<'a>(turns: &'a TurnScheduler, stack: &'a PendingActionStack) -> MatchView<'a> {
    let status = turns.status();
    let responder = stack.responder();
    let debt = stack.front_debt();
    let acting = if status == MatchStatus::InProgress {
        responder.or(debt.map(|d| d.debtor)).or(turns.current())
    } else {
        None
    };
    MatchView {
        status,
        phase: turns.phase(),
        current_turn: turns.current(),
        acting,
        initial_players: turns.rotation(),
        turn_number: turns.turn_number(),
        pending: stack.top(),
        responder,
        debt,
    }
}

fn seat_error(room_id: RoomId, err: SeatError) -> RoomError {
    match err {
        SeatError::AlreadySeated(seat) => RoomError::AlreadyInRoom(seat, room_id),
        SeatError::NotSeated(seat) => RoomError::NotInRoom(seat, room_id),
        SeatError::Sealed => RoomError::InvalidState("initial players are sealed".into()),
    }
}

impl<G: RulesStrategy> MatchRoom<G> {
    async fn run(mut self) {
        info!(room_id = %self.room_id, game_type = self.rules.game_type(), "room actor started");
        self.timers.schedule(RoomTimer::Idle, self.config.idle_timeout);

        while !self.disposed {
            tokio::select! {
                biased;
                cmd = self.inbox.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => self.dispose("all handles dropped"),
                },
                Some(fired) = self.fired.recv() => self.handle_timer(fired),
            }
        }

        info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_command(&mut self, cmd: RoomCommand<G>) {
        match cmd {
            RoomCommand::Join {
                seat,
                options,
                sender,
                reply,
            } => {
                let result = self.handle_join(seat, options, sender);
                let _ = reply.send(result);
            }
            RoomCommand::AddBot {
                seat,
                name,
                agent,
                reply,
            } => {
                let result = self.handle_add_bot(seat, name, agent);
                let _ = reply.send(result);
            }
            RoomCommand::Leave {
                seat,
                consented,
                reply,
            } => {
                let result = self.handle_leave(seat, consented);
                let _ = reply.send(result);
            }
            RoomCommand::Submit { seat, command } => self.submit(seat, command),
            RoomCommand::Snapshot { viewer, reply } => {
                let _ = reply.send(self.snapshot(viewer));
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Dispose => self.dispose("dispose requested"),
        }
    }

    fn handle_timer(&mut self, fired: Fired<RoomTimer>) {
        if !self.timers.claim(&fired) {
            return;
        }
        match fired.key {
            RoomTimer::Bot => self.run_bot(),
            RoomTimer::Teardown => self.dispose("teardown grace elapsed"),
            RoomTimer::Idle => {
                if self.registry.initial_count() == 0 && self.turns.status().is_joinable() {
                    self.dispose("no player joined");
                }
            }
        }
    }

    // -- membership --------------------------------------------------------

    fn handle_join(
        &mut self,
        seat: PlayerId,
        options: JoinOptions,
        sender: SeatSender<G>,
    ) -> Result<JoinAck, RoomError> {
        let seat = options
            .reconnect_token
            .as_deref()
            .and_then(|token| self.registry.seat_for_token(token))
            .unwrap_or(seat);

        if self.registry.contains(seat) {
            return self.resume(seat, sender);
        }

        let status = self.turns.status();
        let kind = if status.is_joinable() {
            if self.registry.initial_count() >= self.config.max_players {
                return Err(RoomError::RoomFull(self.room_id));
            }
            SeatKind::Initial
        } else {
            if !self.config.allow_spectators {
                return Err(RoomError::InvalidState(format!(
                    "cannot join a room that is {status}"
                )));
            }
            if self.config.max_spectators > 0
                && self.registry.spectator_count() >= self.config.max_spectators
            {
                return Err(RoomError::RoomFull(self.room_id));
            }
            SeatKind::Spectator
        };

        let player = self
            .registry
            .join(seat, &options, kind, false)
            .map_err(|e| seat_error(self.room_id, e))?
            .clone();
        if kind == SeatKind::Initial {
            self.timers.cancel(&RoomTimer::Idle);
        }
        self.senders.insert(seat, sender);
        info!(
            room_id = %self.room_id,
            %seat,
            spectator = player.is_spectator,
            players = self.registry.len(),
            "player joined"
        );

        self.broadcast(Event::PlayerJoined {
            seat,
            display_name: player.display_name.clone(),
            spectator: player.is_spectator,
        });
        self.send_snapshot(seat);
        self.maybe_start();

        Ok(JoinAck {
            room_id: self.room_id,
            seat,
            reconnect_token: player.reconnect_token().to_string(),
            spectator: player.is_spectator,
            reconnected: false,
        })
    }

    /// Re-attaches a seat that already has a record.
    fn resume(&mut self, seat: PlayerId, sender: SeatSender<G>) -> Result<JoinAck, RoomError> {
        if self.bots.is_bot(seat) {
            return Err(RoomError::AlreadyInRoom(seat, self.room_id));
        }
        let was_disconnected = self
            .registry
            .reconnect(seat)
            .map_err(|e| seat_error(self.room_id, e))?;
        self.senders.insert(seat, sender);

        if was_disconnected {
            info!(room_id = %self.room_id, %seat, "player reconnected");
            self.broadcast(Event::PlayerReconnected { seat });
        }
        self.send_snapshot(seat);

        let player = self
            .registry
            .get(seat)
            .ok_or(RoomError::NotInRoom(seat, self.room_id))?;
        Ok(JoinAck {
            room_id: self.room_id,
            seat,
            reconnect_token: player.reconnect_token().to_string(),
            spectator: player.is_spectator,
            reconnected: true,
        })
    }

    fn handle_add_bot(
        &mut self,
        seat: PlayerId,
        name: String,
        agent: Box<dyn BotAgent<G>>,
    ) -> Result<(), RoomError> {
        if !self.turns.status().is_joinable() {
            return Err(RoomError::InvalidState(
                "bots can only join before the match starts".into(),
            ));
        }
        if self.registry.initial_count() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.room_id));
        }

        let options = JoinOptions {
            display_name: Some(name),
            ..Default::default()
        };
        let display_name = self
            .registry
            .join(seat, &options, SeatKind::Initial, true)
            .map_err(|e| seat_error(self.room_id, e))?
            .display_name
            .clone();
        self.bots.add(seat, agent);
        self.timers.cancel(&RoomTimer::Idle);
        info!(room_id = %self.room_id, %seat, name = %display_name, "bot joined");

        self.broadcast(Event::PlayerJoined {
            seat,
            display_name,
            spectator: false,
        });
        self.maybe_start();
        Ok(())
    }

    fn handle_leave(&mut self, seat: PlayerId, consented: bool) -> Result<(), RoomError> {
        if !self.registry.contains(seat) {
            return Err(RoomError::NotInRoom(seat, self.room_id));
        }
        self.senders.remove(&seat);

        if !consented {
            self.registry
                .disconnect(seat)
                .map_err(|e| seat_error(self.room_id, e))?;
            info!(room_id = %self.room_id, %seat, "player disconnected");
            self.broadcast(Event::PlayerDisconnected { seat });
            return Ok(());
        }

        let was_initial = self.registry.is_initial(seat);
        self.registry.remove(seat);
        self.bots.remove(seat);
        info!(room_id = %self.room_id, %seat, players = self.registry.len(), "player left");
        self.broadcast(Event::PlayerLeft { seat });

        match self.turns.status() {
            MatchStatus::Waiting if self.registry.human_count() == 0 => {
                self.dispose("last player left before the start");
            }
            MatchStatus::Waiting => self.maybe_start(),
            MatchStatus::InProgress if was_initial => self.forfeit(seat),
            _ => {}
        }
        Ok(())
    }

    fn maybe_start(&mut self) {
        if !self.turns.status().is_joinable() {
            return;
        }
        let count = self.registry.initial_count();
        if count == 0 || count < self.config.min_players {
            return;
        }
        if self.config.start == StartPolicy::AllReady && !self.registry.all_initial_ready() {
            return;
        }
        self.start_match();
    }

    fn start_match(&mut self) {
        let rotation = self.registry.seal();
        let Some(&first) = rotation.first() else {
            return;
        };
        let state = self.rules.init(&self.game_config, &rotation);
        let phase = self.rules.opening_phase(&state, first);
        if self.turns.start(rotation.clone(), phase.clone()).is_none() {
            return;
        }
        self.game_state = Some(state);
        info!(
            room_id = %self.room_id,
            players = rotation.len(),
            %first,
            %phase,
            "match started"
        );

        self.broadcast(Event::GameStarted {
            players: rotation,
            first_turn: first,
            phase,
        });
        self.broadcast_snapshots();
        self.after_mutation();
    }

    // -- command dispatch --------------------------------------------------

    fn submit(&mut self, seat: PlayerId, command: Command<G::Move>) {
        let name = command.name();
        if let Err(rejection) = self.apply_command(seat, command) {
            debug!(
                room_id = %self.room_id,
                %seat,
                command = name,
                %rejection,
                "command rejected"
            );
            self.send_to(
                seat,
                Outbound::Event(Event::Error {
                    message: rejection.to_string(),
                }),
            );
        }
    }

    /// The single entry point for seat input, human or bot. A rejected
    /// command leaves every piece of state untouched.
    fn apply_command(
        &mut self,
        seat: PlayerId,
        command: Command<G::Move>,
    ) -> Result<(), Rejection> {
        let player = self.registry.get(seat).ok_or(Rejection::NotSeated(seat))?;
        let spectator = player.is_spectator;

        match command {
            Command::Chat { message } => self.chat(seat, message),
            Command::Ready if spectator => Err(Rejection::Spectator("ready")),
            Command::Ready => self.ready(seat),
            Command::Surrender if spectator => Err(Rejection::Spectator("surrender")),
            Command::Surrender => self.surrender(seat),
            Command::Move { .. } if spectator => Err(Rejection::Spectator("move")),
            Command::Move { payload } => self.play(seat, payload),
            Command::Respond { .. } if spectator => Err(Rejection::Spectator("respond")),
            Command::Respond { response } => self.respond(seat, response),
        }
    }

    fn chat(&mut self, seat: PlayerId, message: String) -> Result<(), Rejection> {
        let message = message.trim();
        if message.is_empty() || message.chars().count() > MAX_CHAT_LEN {
            return Err(Rejection::BadChat(MAX_CHAT_LEN));
        }
        self.broadcast(Event::Chat {
            seat,
            message: message.to_string(),
        });
        Ok(())
    }

    fn ready(&mut self, seat: PlayerId) -> Result<(), Rejection> {
        if !self.turns.status().is_joinable() {
            return Err(Rejection::AlreadyStarted);
        }
        let changed = self
            .registry
            .set_ready(seat)
            .map_err(|_| Rejection::NotSeated(seat))?;
        if changed {
            self.broadcast(Event::PlayerReady { seat });
        }
        self.maybe_start();
        Ok(())
    }

    fn surrender(&mut self, seat: PlayerId) -> Result<(), Rejection> {
        self.require_contender(seat)?;
        info!(room_id = %self.room_id, %seat, "seat surrendered");
        self.forfeit(seat);
        Ok(())
    }

    fn require_contender(&self, seat: PlayerId) -> Result<(), Rejection> {
        if self.turns.status() != MatchStatus::InProgress {
            return Err(Rejection::NotInProgress);
        }
        if self.turns.is_forfeited(seat) {
            return Err(Rejection::Forfeited(seat));
        }
        Ok(())
    }

    fn play(&mut self, seat: PlayerId, payload: G::Move) -> Result<(), Rejection> {
        self.require_contender(seat)?;

        if let Some(responder) = self.stack.responder() {
            return Err(if responder == seat {
                Rejection::ResponseExpected
            } else {
                Rejection::AwaitingResponse(responder)
            });
        }
        if let Some(debt) = self.stack.front_debt() {
            if debt.debtor != seat {
                return Err(Rejection::AwaitingPayment(debt.debtor));
            }
        } else if self.rules.is_turn_gated(&payload) && self.turns.current() != Some(seat) {
            return Err(Rejection::NotYourTurn);
        }

        let applied = {
            let Some(state) = self.game_state.as_mut() else {
                return Err(Rejection::NotInProgress);
            };
            let view = match_view(&self.turns, &self.stack);
            self.rules
                .validate(state, &view, seat, &payload)
                .map_err(Rejection::Illegal)?;
            debug!(room_id = %self.room_id, %seat, ?payload, "move accepted");
            self.rules.apply(state, &view, seat, payload)
        };

        self.dispatch(applied.events);
        self.apply_effect(seat, applied.effect);
        self.after_mutation();
        Ok(())
    }

    fn respond(&mut self, seat: PlayerId, response: Response) -> Result<(), Rejection> {
        self.require_contender(seat)?;
        let Some(top) = self.stack.top().cloned() else {
            return Err(Rejection::NothingPending);
        };
        match self.stack.responder() {
            Some(responder) if responder == seat => {}
            Some(responder) => return Err(Rejection::AwaitingResponse(responder)),
            None => return Err(Rejection::NothingPending),
        }

        match response {
            Response::Counter { card_ref } => {
                let events = {
                    let Some(state) = self.game_state.as_mut() else {
                        return Err(Rejection::NotInProgress);
                    };
                    if !self.rules.can_counter(state, seat, &top) {
                        return Err(Rejection::NoCounter);
                    }
                    self.rules
                        .pay_counter(state, seat, card_ref.as_deref(), &top)
                        .map_err(Rejection::Illegal)?
                };
                let counter = self
                    .stack
                    .counter(seat, card_ref)
                    .map_err(|_| Rejection::NothingPending)?;
                let responder = counter.target;
                debug!(room_id = %self.room_id, %seat, counter = %counter.id, "action countered");

                self.dispatch(events);
                self.broadcast(Event::ActionCountered { counter, responder });
                self.change_phase(Phase::respond(), responder);
            }
            Response::Accept => self.accept(seat)?,
        }

        self.after_mutation();
        Ok(())
    }

    /// Resolves the chain the responder just accepted and moves on to the
    /// next chain, debt, or back to play.
    fn accept(&mut self, seat: PlayerId) -> Result<(), Rejection> {
        let resolved = self
            .stack
            .accept(seat)
            .map_err(|_| Rejection::NothingPending)?;

        for Resolved { action, applied } in resolved {
            debug!(room_id = %self.room_id, action = %action.id, applied, "action resolved");
            self.broadcast(Event::ActionResolved {
                action: action.clone(),
                applied,
            });
            if !applied {
                continue;
            }
            let Some(state) = self.game_state.as_mut() else {
                continue;
            };
            let resolution = self.rules.resolve(state, &action);
            self.dispatch(resolution.events);
            for debt in resolution.debts {
                if self.turns.is_forfeited(debt.debtor)
                    || self.turns.is_forfeited(debt.creditor)
                {
                    continue;
                }
                self.broadcast(Event::DebtCreated { debt: debt.clone() });
                self.stack.push_debt(debt);
            }
        }

        self.advance_stack();
        Ok(())
    }

    // -- effects -----------------------------------------------------------

    fn apply_effect(&mut self, actor: PlayerId, effect: Effect) {
        match effect {
            Effect::Stay => {}
            Effect::Phase(phase) => self.change_phase(phase, actor),
            Effect::EndTurn => self.end_turn(),
            Effect::Contingent(effects) if effects.is_empty() => {}
            Effect::Contingent(effects) => {
                let return_phase = self.turns.phase().clone();
                if let Err(err) = self.stack.begin(actor, return_phase, effects) {
                    warn!(room_id = %self.room_id, %actor, %err, "contingent effect dropped");
                    return;
                }
                self.advance_stack();
            }
            Effect::Settled => match self.stack.settle_front() {
                Some(debt) => {
                    debug!(
                        room_id = %self.room_id,
                        debtor = %debt.debtor,
                        amount = debt.amount,
                        "debt settled"
                    );
                    self.broadcast(Event::DebtSettled { debt });
                    self.advance_stack();
                }
                None => {
                    warn!(room_id = %self.room_id, %actor, "settlement reported without a debt")
                }
            },
        }
    }

    /// Opens the next queued chain, else hands the floor to the next
    /// debtor, else returns play to the turn holder.
    fn advance_stack(&mut self) {
        if let Some(action) = self.stack.open_next() {
            let responder = action.target;
            self.broadcast(Event::ActionPending { action, responder });
            self.change_phase(Phase::respond(), responder);
            return;
        }
        if self.stack.is_active() {
            return;
        }
        if let Some(debtor) = self.stack.front_debt().map(|d| d.debtor) {
            self.change_phase(Phase::pay(), debtor);
            return;
        }
        if let Some(origin) = self.stack.finish() {
            match self.turns.current() {
                Some(holder) if !self.turns.is_forfeited(holder) => {
                    self.change_phase(origin.phase, holder);
                }
                _ => self.end_turn(),
            }
        }
    }

    fn change_phase(&mut self, phase: Phase, actor: PlayerId) {
        self.turns.set_phase(phase.clone());
        self.broadcast(Event::PhaseChanged { phase, actor });
    }

    fn end_turn(&mut self) {
        let Some(previous) = self.turns.current() else {
            return;
        };
        let Some(next) = self.turns.advance() else {
            return;
        };
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        let phase = self.rules.opening_phase(state, next);
        debug!(
            room_id = %self.room_id,
            %previous,
            %next,
            turn = self.turns.turn_number(),
            "turn ended"
        );

        self.broadcast(Event::TurnEnded {
            previous,
            next,
            turn_number: self.turns.turn_number(),
            turn_started_at_ms: self.turns.turn_started_at_ms().unwrap_or_default(),
        });
        self.change_phase(phase, next);
    }

    /// Bookkeeping after any applied change: new epoch, win check, and the
    /// next bot move if a bot is now acting.
    fn after_mutation(&mut self) {
        self.epoch += 1;
        self.check_win();
        let acting = match_view(&self.turns, &self.stack).acting;
        self.bots
            .arm(self.turns.status(), acting, self.epoch, &mut self.timers);
    }

    fn check_win(&mut self) {
        if self.turns.status() != MatchStatus::InProgress {
            return;
        }
        let Some(state) = self.game_state.as_ref() else {
            return;
        };
        match self.rules.check_win(state, &match_view(&self.turns, &self.stack)) {
            Verdict::Continue => {}
            Verdict::Winner(winner) => self.finish(Some(winner), false, EndReason::Rules),
            Verdict::Draw => self.finish(None, true, EndReason::Rules),
        }
    }

    /// Takes `seat` out of contention and lets the rules decide whether the
    /// match goes on.
    fn forfeit(&mut self, seat: PlayerId) {
        if !self.turns.forfeit(seat) {
            return;
        }
        let remaining = self.turns.contenders();
        let verdict = match self.game_state.as_ref() {
            Some(state) => self.rules.forfeit(state, seat, &remaining),
            None => Verdict::Continue,
        };
        info!(room_id = %self.room_id, %seat, remaining = remaining.len(), "seat forfeited");

        match verdict {
            Verdict::Winner(winner) => {
                self.finish(Some(winner), false, EndReason::Forfeit { seat })
            }
            Verdict::Draw => self.finish(None, true, EndReason::Forfeit { seat }),
            Verdict::Continue => {
                self.stack.withdraw(seat);
                for debt in self.stack.forgive(seat) {
                    self.broadcast(Event::DebtSettled { debt });
                }
                if self.stack.responder() == Some(seat) {
                    let _ = self.accept(seat);
                } else if !self.stack.is_active() {
                    self.advance_stack();
                }
                if !self.stack.is_busy() && self.turns.current() == Some(seat) {
                    self.end_turn();
                }
            }
        }
        self.after_mutation();
    }

    fn finish(&mut self, winner: Option<PlayerId>, is_draw: bool, reason: EndReason) {
        if !self.turns.finish(winner, is_draw) {
            return;
        }
        self.stack.clear();
        self.bots.disarm(&mut self.timers);
        info!(
            room_id = %self.room_id,
            winner = ?winner,
            is_draw,
            ?reason,
            duration_ms = self.turns.duration().as_millis() as u64,
            "match finished"
        );

        self.broadcast(Event::GameEnded {
            winner,
            is_draw,
            reason,
        });
        self.record_result();
        self.timers
            .schedule(RoomTimer::Teardown, self.config.teardown_grace);
    }

    /// Hands the result to the recorder on its own task.
    fn record_result(&self) {
        let participants = self.registry.participants();
        let winner = self.turns.winner();
        let winner_identity = winner
            .and_then(|w| participants.iter().find(|p| p.seat == w))
            .map(|p| p.identity.clone());
        let vs_bot = participants.iter().any(|p| p.is_bot);
        let record = MatchRecord {
            room_id: self.room_id,
            game_type: self.rules.game_type().to_string(),
            winner,
            winner_identity,
            is_draw: self.turns.is_draw(),
            participants,
            vs_bot,
            duration_ms: self.turns.duration().as_millis() as u64,
        };

        let recorder = Arc::clone(&self.recorder);
        let room_id = self.room_id;
        tokio::spawn(async move {
            if let Err(err) = recorder.record_match(record).await {
                warn!(%room_id, %err, "failed to record match result");
            }
        });
    }

    fn dispose(&mut self, reason: &str) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.timers.shutdown();
        self.bots.clear();
        self.stack.clear();
        self.senders.clear();
        info!(room_id = %self.room_id, reason, status = %self.turns.status(), "room disposed");
    }

    // -- bots --------------------------------------------------------------

    fn run_bot(&mut self) {
        let acting = match_view(&self.turns, &self.stack).acting;
        let Some(seat) = self.bots.take_due(self.turns.status(), acting, self.epoch) else {
            return;
        };

        let decision = {
            let Some(state) = self.game_state.as_ref() else {
                return;
            };
            let view = BotView {
                seat,
                rules: &self.rules,
                state,
                view: match_view(&self.turns, &self.stack),
            };
            self.bots.decide(&view)
        };

        let played = match decision {
            Ok(decision) => match self.apply_command(seat, decision.into_command()) {
                Ok(()) => true,
                Err(rejection) => {
                    warn!(room_id = %self.room_id, %seat, %rejection, "bot move rejected");
                    false
                }
            },
            Err(err) => {
                warn!(room_id = %self.room_id, %seat, %err, "bot failed to decide");
                false
            }
        };
        if !played {
            self.bot_fallback(seat);
        }
    }

    fn bot_fallback(&mut self, seat: PlayerId) {
        let fallback = {
            let Some(state) = self.game_state.as_ref() else {
                return;
            };
            let view = BotView {
                seat,
                rules: &self.rules,
                state,
                view: match_view(&self.turns, &self.stack),
            };
            BotScheduler::fallback(&view)
        };

        if let Some(command) = fallback {
            match self.apply_command(seat, command) {
                Ok(()) => return,
                Err(rejection) => {
                    warn!(room_id = %self.room_id, %seat, %rejection, "bot fallback rejected");
                }
            }
        }
        self.force_pass(seat);
    }

    /// Moves the match past a bot that cannot produce any accepted input.
    fn force_pass(&mut self, seat: PlayerId) {
        if self.stack.responder() == Some(seat) {
            let _ = self.accept(seat);
        } else if self.stack.front_debt().is_some_and(|d| d.debtor == seat) {
            if let Some(debt) = self.stack.settle_front() {
                self.broadcast(Event::DebtSettled { debt });
            }
            self.advance_stack();
        } else if self.turns.current() == Some(seat) {
            self.end_turn();
        } else {
            return;
        }
        warn!(room_id = %self.room_id, %seat, "bot could not act, forced the match forward");
        self.after_mutation();
    }

    // -- outbound ----------------------------------------------------------

    fn broadcast(&self, event: Event<G::Event>) {
        for sender in self.senders.values() {
            let _ = sender.send(Outbound::Event(event.clone()));
        }
    }

    /// Routes domain events to their recipients.
    fn dispatch(&self, events: Vec<(Recipient, G::Event)>) {
        for (recipient, event) in events {
            let event = Event::Domain { event };
            match recipient {
                Recipient::All => self.broadcast(event),
                Recipient::Player(seat) => self.send_to(seat, Outbound::Event(event)),
                Recipient::AllExcept(excluded) => {
                    for (seat, sender) in &self.senders {
                        if *seat != excluded {
                            let _ = sender.send(Outbound::Event(event.clone()));
                        }
                    }
                }
            }
        }
    }

    /// Silently drops the message if the seat has no live connection.
    fn send_to(&self, seat: PlayerId, msg: Outbound<G>) {
        if let Some(sender) = self.senders.get(&seat) {
            let _ = sender.send(msg);
        }
    }

    fn send_snapshot(&self, seat: PlayerId) {
        self.send_to(seat, Outbound::Snapshot(Box::new(self.snapshot(Some(seat)))));
    }

    fn broadcast_snapshots(&self) {
        for seat in self.senders.keys() {
            self.send_snapshot(*seat);
        }
    }

    fn snapshot(&self, viewer: Option<PlayerId>) -> MatchSnapshot<G::State> {
        let view = match_view(&self.turns, &self.stack);
        let state = self.game_state.as_ref().map(|state| match viewer {
            Some(seat) => self.rules.redact(state, seat),
            None => state.clone(),
        });
        MatchSnapshot {
            room_id: self.room_id,
            game_type: self.rules.game_type().to_string(),
            status: self.turns.status(),
            phase: self.turns.phase().clone(),
            current_turn: self.turns.current(),
            acting: view.acting,
            turn_number: self.turns.turn_number(),
            turn_started_at_ms: self.turns.turn_started_at_ms(),
            winner: self.turns.winner(),
            is_draw: self.turns.is_draw(),
            players: self.registry.iter().cloned().collect(),
            initial_players: self.registry.initial_players().to_vec(),
            pending: self.stack.entries().to_vec(),
            responder: self.stack.responder(),
            debts: self.stack.debts().cloned().collect(),
            state,
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id,
            game_type: self.rules.game_type().to_string(),
            status: self.turns.status(),
            player_count: self.registry.len() - self.registry.spectator_count(),
            spectator_count: self.registry.spectator_count(),
            bot_count: self.bots.len(),
            max_players: self.config.max_players,
        }
    }
}

/// Spawns a room actor and returns a handle to it.
///
/// Room settings come from `rules.room_config()`. `channel_size` bounds the
/// command inbox; senders wait when it is full.
pub fn spawn_room<G: RulesStrategy>(
    room_id: RoomId,
    rules: G,
    game_config: G::Config,
    recorder: Arc<dyn MatchRecorder>,
    channel_size: usize,
) -> RoomHandle<G> {
    let (tx, rx) = mpsc::channel(channel_size);
    let (timers, fired) = TimerSet::new();
    let config = rules.room_config();

    let room = MatchRoom {
        room_id,
        bots: BotScheduler::new(config.bot_think),
        rules,
        game_config,
        config,
        registry: PlayerRegistry::new(),
        turns: TurnScheduler::new(),
        stack: PendingActionStack::new(),
        game_state: None,
        senders: HashMap::new(),
        recorder,
        timers,
        fired,
        inbox: rx,
        epoch: 0,
        disposed: false,
    };

    tokio::spawn(room.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
