//! Automated seats.
//!
//! A bot's move is scheduled as a [`RoomTimer::Bot`] after a think delay.
//! The timer carries nothing but a [`BotTicket`]: when it fires, the room
//! re-checks that the match is still running, that the bot is still the
//! acting seat, and that nothing changed since the ticket was issued. Only
//! then is the agent asked for a move, and the move goes through the same
//! validation as a human command.

use std::collections::HashMap;

use parlor_protocol::{Command, Debt, PlayerId, Response};
use parlor_timer::{ThinkDelay, TimerSet};
use tracing::{debug, trace};

use crate::room::RoomTimer;
use crate::rules::{MatchView, RulesStrategy};
use crate::MatchStatus;

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("no legal move available")]
    NoMove,

    #[error("bot decision failed: {0}")]
    Internal(String),
}

/// What a bot decided to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotMove<M> {
    Play(M),
    Respond(Response),
}

impl<M> BotMove<M> {
    pub fn into_command(self) -> Command<M> {
        match self {
            Self::Play(payload) => Command::Move { payload },
            Self::Respond(response) => Command::Respond { response },
        }
    }
}

/// Everything a bot may look at when deciding.
pub struct BotView<'a, G: RulesStrategy> {
    pub seat: PlayerId,
    pub rules: &'a G,
    pub state: &'a G::State,
    pub view: MatchView<'a>,
}

impl<'a, G: RulesStrategy> BotView<'a, G> {
    /// The bot must answer the top of the pending-action stack.
    pub fn is_responding(&self) -> bool {
        self.view.responder == Some(self.seat)
    }

    /// The debt the bot is paying right now, if any.
    pub fn owed(&self) -> Option<&'a Debt> {
        self.view.debt.filter(|debt| debt.debtor == self.seat)
    }

    pub fn can_counter(&self) -> bool {
        self.view
            .pending
            .is_some_and(|action| self.rules.can_counter(self.state, self.seat, action))
    }
}

/// A move-choosing policy for one bot seat.
pub trait BotAgent<G: RulesStrategy>: Send {
    fn decide(&mut self, view: &BotView<'_, G>) -> Result<BotMove<G::Move>, BotError>;
}

/// Identifies one scheduled bot action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BotTicket {
    pub seat: PlayerId,
    /// The room's mutation counter when the ticket was issued.
    pub epoch: u64,
}

/// Owns the room's bot agents and its single pending bot timer.
pub struct BotScheduler<G: RulesStrategy> {
    agents: HashMap<PlayerId, Box<dyn BotAgent<G>>>,
    think: ThinkDelay,
    ticket: Option<BotTicket>,
}

impl<G: RulesStrategy> BotScheduler<G> {
    pub fn new(think: ThinkDelay) -> Self {
        Self {
            agents: HashMap::new(),
            think,
            ticket: None,
        }
    }

    pub fn add(&mut self, seat: PlayerId, agent: Box<dyn BotAgent<G>>) {
        self.agents.insert(seat, agent);
    }

    pub fn remove(&mut self, seat: PlayerId) -> bool {
        if self.ticket.is_some_and(|t| t.seat == seat) {
            self.ticket = None;
        }
        self.agents.remove(&seat).is_some()
    }

    pub fn is_bot(&self, seat: PlayerId) -> bool {
        self.agents.contains_key(&seat)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn ticket(&self) -> Option<BotTicket> {
        self.ticket
    }

    /// Schedules the acting seat's move if it is a bot; otherwise cancels
    /// any pending bot timer.
    pub(crate) fn arm(
        &mut self,
        status: MatchStatus,
        acting: Option<PlayerId>,
        epoch: u64,
        timers: &mut TimerSet<RoomTimer>,
    ) -> Option<BotTicket> {
        let seat = match acting {
            Some(seat) if status == MatchStatus::InProgress && self.is_bot(seat) => seat,
            _ => {
                self.disarm(timers);
                return None;
            }
        };

        let ticket = BotTicket { seat, epoch };
        if self.ticket == Some(ticket) && timers.is_pending(&RoomTimer::Bot) {
            return Some(ticket);
        }
        let delay = self.think.sample();
        timers.schedule(RoomTimer::Bot, delay)?;
        self.ticket = Some(ticket);
        debug!(%seat, epoch, delay_ms = delay.as_millis() as u64, "bot move scheduled");
        Some(ticket)
    }

    pub(crate) fn disarm(&mut self, timers: &mut TimerSet<RoomTimer>) {
        self.ticket = None;
        timers.cancel(&RoomTimer::Bot);
    }

    /// Consumes the ticket of a fired bot timer. Returns the seat to act
    /// for, or `None` if the ticket went stale while the bot was thinking.
    pub fn take_due(
        &mut self,
        status: MatchStatus,
        acting: Option<PlayerId>,
        epoch: u64,
    ) -> Option<PlayerId> {
        let ticket = self.ticket.take()?;
        let current = status == MatchStatus::InProgress
            && acting == Some(ticket.seat)
            && epoch == ticket.epoch
            && self.is_bot(ticket.seat);
        if !current {
            trace!(
                seat = %ticket.seat,
                ticket_epoch = ticket.epoch,
                epoch,
                %status,
                "stale bot ticket dropped"
            );
            return None;
        }
        Some(ticket.seat)
    }

    /// Asks the seat's agent for a move.
    pub fn decide(&mut self, view: &BotView<'_, G>) -> Result<BotMove<G::Move>, BotError> {
        let agent = self
            .agents
            .get_mut(&view.seat)
            .ok_or_else(|| BotError::Internal(format!("no agent for seat {}", view.seat)))?;
        agent.decide(view)
    }

    /// The safe default for a bot whose own move failed: accept when
    /// responding, otherwise whatever the rules offer.
    pub fn fallback(view: &BotView<'_, G>) -> Option<Command<G::Move>> {
        if view.is_responding() {
            return Some(Command::Respond {
                response: Response::Accept,
            });
        }
        view.rules
            .default_move(view.state, &view.view, view.seat)
            .map(|payload| Command::Move { payload })
    }

    /// Drops every agent and the pending ticket.
    pub fn clear(&mut self) {
        self.agents.clear();
        self.ticket = None;
    }
}
