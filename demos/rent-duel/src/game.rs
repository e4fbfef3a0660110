//! Rent Duel rules.
//!
//! Two seats race to build five properties. Each turn a seat draws two
//! cards, then plays up to three: money goes to the bank, properties are
//! built, and rent or birthday cards charge the opponent. A charged seat may
//! answer with a Just Say No, which the charger may in turn refuse with one
//! of their own. A seat that cannot pay in cash hands over properties, and
//! only a seat with nothing left may pay short. When the deck runs out, the
//! larger property portfolio wins.

use std::collections::{BTreeMap, BTreeSet};

use parlor::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const DRAW: &str = "draw";
pub const PLAY: &str = "play";
pub const PROPERTIES_TO_WIN: usize = 5;
pub const PLAYS_PER_TURN: u8 = 3;
const DRAW_COUNT: usize = 2;
const RENT: &str = "rent";
const BIRTHDAY: &str = "birthday";
const BIRTHDAY_GIFT: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Card {
    Money { value: u64 },
    Property { name: String, value: u64 },
    Rent { amount: u64 },
    Birthday,
    JustSayNo,
    /// A card the viewer is not allowed to see.
    FaceDown,
}

impl Card {
    fn money(value: u64) -> Self {
        Self::Money { value }
    }

    fn property(name: &str, value: u64) -> Self {
        Self::Property {
            name: name.to_string(),
            value,
        }
    }

    /// Face value of money and properties. Action cards are worth nothing.
    pub fn value(&self) -> u64 {
        match self {
            Self::Money { value } | Self::Property { value, .. } => *value,
            _ => 0,
        }
    }

    /// Whether the card can be played on its own turn.
    pub fn is_playable(&self) -> bool {
        !matches!(self, Self::JustSayNo | Self::FaceDown)
    }
}

/// The 40-card deck, unshuffled.
pub fn standard_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(40);
    for (value, copies) in [(1, 6), (2, 5), (3, 3), (5, 2)] {
        deck.extend(std::iter::repeat_n(Card::money(value), copies));
    }
    for (name, value) in [
        ("Baltic Avenue", 1),
        ("Oriental Avenue", 1),
        ("Vermont Avenue", 1),
        ("St. Charles Place", 2),
        ("Virginia Avenue", 2),
        ("Tennessee Avenue", 2),
        ("Kentucky Avenue", 3),
        ("Illinois Avenue", 3),
        ("Atlantic Avenue", 3),
        ("Pacific Avenue", 4),
        ("Park Place", 4),
        ("Boardwalk", 4),
    ] {
        deck.push(Card::property(name, value));
    }
    deck.extend(std::iter::repeat_n(Card::Rent { amount: 2 }, 4));
    deck.extend(std::iter::repeat_n(Card::Rent { amount: 4 }, 2));
    deck.extend(std::iter::repeat_n(Card::Birthday, 3));
    deck.extend(std::iter::repeat_n(Card::JustSayNo, 3));
    deck
}

#[derive(Debug, Clone)]
pub struct DuelConfig {
    /// Shuffle seed. Random when `None`.
    pub seed: Option<u64>,
    pub hand_size: usize,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            seed: None,
            hand_size: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuelState {
    /// Top of the deck is the end of the vector.
    pub deck: Vec<Card>,
    pub discard: Vec<Card>,
    pub hands: BTreeMap<PlayerId, Vec<Card>>,
    pub banks: BTreeMap<PlayerId, u64>,
    pub properties: BTreeMap<PlayerId, Vec<Card>>,
    pub plays_left: u8,
    pub exhausted: bool,
}

impl DuelState {
    pub fn hand(&self, seat: PlayerId) -> &[Card] {
        self.hands.get(&seat).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn bank(&self, seat: PlayerId) -> u64 {
        self.banks.get(&seat).copied().unwrap_or(0)
    }

    pub fn property_count(&self, seat: PlayerId) -> usize {
        self.properties.get(&seat).map_or(0, Vec::len)
    }

    pub fn property_value(&self, seat: PlayerId) -> u64 {
        self.built(seat).iter().map(Card::value).sum()
    }

    pub fn built(&self, seat: PlayerId) -> &[Card] {
        self.properties.get(&seat).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Cash plus every property: what a seat must give up before it may
    /// pay short.
    pub fn estate(&self, seat: PlayerId) -> u64 {
        self.bank(seat) + self.property_value(seat)
    }

    fn deal(&mut self, seat: PlayerId, count: usize) -> Vec<Card> {
        let at = self.deck.len().saturating_sub(count);
        let cards: Vec<Card> = self.deck.split_off(at);
        self.hands.entry(seat).or_default().extend(cards.iter().cloned());
        cards
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DuelMove {
    Draw,
    /// Plays the card at `card` in the hand.
    Play { card: usize },
    EndTurn,
    /// Pays the front debt with cash and, when cash is short, properties
    /// at the given positions.
    Pay {
        amount: u64,
        #[serde(default)]
        properties: Vec<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DuelEvent {
    /// Public half of a draw.
    Drew { seat: PlayerId, count: usize },
    /// Private half of a draw, sent to the drawing seat only.
    Dealt { cards: Vec<Card> },
    Banked { seat: PlayerId, value: u64 },
    Built {
        seat: PlayerId,
        name: String,
        value: u64,
    },
    Charged {
        seat: PlayerId,
        effect: String,
        amount: u64,
    },
    CounterPlayed { seat: PlayerId },
    Paid {
        from: PlayerId,
        to: PlayerId,
        amount: u64,
    },
    Surrendered {
        from: PlayerId,
        to: PlayerId,
        name: String,
        value: u64,
    },
    DeckExhausted,
}

/// The rules strategy for Rent Duel.
#[derive(Debug, Clone, Default)]
pub struct RentDuel {
    think: ThinkDelay,
}

impl RentDuel {
    pub fn new(think: ThinkDelay) -> Self {
        Self { think }
    }
}

/// How `seat` settles `owed`: cash first, then the cheapest properties until
/// the debt is covered or nothing is left.
pub fn liquidate(state: &DuelState, seat: PlayerId, owed: u64) -> DuelMove {
    let amount = owed.min(state.bank(seat));
    let mut lots: Vec<(u64, usize)> = state
        .built(seat)
        .iter()
        .enumerate()
        .map(|(at, card)| (card.value(), at))
        .collect();
    lots.sort_unstable();

    let mut offered = amount;
    let mut properties = Vec::new();
    for (value, at) in lots {
        if offered >= owed {
            break;
        }
        offered += value;
        properties.push(at);
    }
    DuelMove::Pay { amount, properties }
}

fn opponents(view: &MatchView<'_>, seat: PlayerId) -> Vec<PlayerId> {
    view.initial_players.iter().copied().filter(|p| *p != seat).collect()
}

impl RulesStrategy for RentDuel {
    type Config = DuelConfig;
    type State = DuelState;
    type Move = DuelMove;
    type Event = DuelEvent;

    fn game_type(&self) -> &str {
        "rent-duel"
    }

    fn room_config(&self) -> RoomConfig {
        RoomConfig {
            min_players: 2,
            max_players: 2,
            bot_think: self.think,
            ..RoomConfig::default()
        }
    }

    fn init(&self, config: &DuelConfig, players: &[PlayerId]) -> DuelState {
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        let mut deck = standard_deck();
        deck.shuffle(&mut StdRng::seed_from_u64(seed));
        tracing::debug!(seed, cards = deck.len(), "deck shuffled");

        let mut state = DuelState {
            deck,
            discard: Vec::new(),
            hands: BTreeMap::new(),
            banks: players.iter().map(|p| (*p, 0)).collect(),
            properties: players.iter().map(|p| (*p, Vec::new())).collect(),
            plays_left: 0,
            exhausted: false,
        };
        for seat in players {
            state.deal(*seat, config.hand_size);
        }
        state
    }

    fn opening_phase(&self, _state: &DuelState, _seat: PlayerId) -> Phase {
        Phase::new(DRAW)
    }

    fn validate(
        &self,
        state: &DuelState,
        view: &MatchView<'_>,
        seat: PlayerId,
        mv: &DuelMove,
    ) -> Result<(), String> {
        match mv {
            DuelMove::Pay { amount, properties } => {
                let Some(debt) = view.debt.filter(|d| d.debtor == seat) else {
                    return Err("you do not owe anything".into());
                };
                let bank = state.bank(seat);
                if *amount > bank {
                    return Err(format!("you only have {bank} in the bank"));
                }
                let built = state.built(seat);
                let mut seen = BTreeSet::new();
                let mut offered = *amount;
                for at in properties {
                    let Some(card) = built.get(*at) else {
                        return Err(format!("no property at position {at}"));
                    };
                    if !seen.insert(*at) {
                        return Err(format!("property {at} offered twice"));
                    }
                    offered += card.value();
                }
                if !settles(debt, offered, state.estate(seat)) {
                    return Err(format!("pay {} or everything you own", debt.amount));
                }
                Ok(())
            }
            _ if view.debt.is_some() => Err("pay your debt first".into()),
            DuelMove::Draw if view.phase.as_str() != DRAW => Err("you have already drawn".into()),
            DuelMove::Draw => Ok(()),
            _ if view.phase.as_str() != PLAY => Err("draw first".into()),
            DuelMove::EndTurn => Ok(()),
            DuelMove::Play { card } => {
                if state.plays_left == 0 {
                    return Err("no plays left this turn".into());
                }
                match state.hand(seat).get(*card) {
                    None => Err(format!("no card at position {card}")),
                    Some(c) if !c.is_playable() => {
                        Err("that card can only be played in response".into())
                    }
                    Some(_) => Ok(()),
                }
            }
        }
    }

    fn apply(
        &self,
        state: &mut DuelState,
        view: &MatchView<'_>,
        seat: PlayerId,
        mv: DuelMove,
    ) -> Applied<DuelEvent> {
        match mv {
            DuelMove::Draw => {
                let cards = state.deal(seat, DRAW_COUNT);
                state.plays_left = PLAYS_PER_TURN;
                let drew = DuelEvent::Drew {
                    seat,
                    count: cards.len(),
                };
                let mut applied = Applied::new(Effect::Phase(Phase::new(PLAY)))
                    .with_event(Recipient::AllExcept(seat), drew)
                    .with_event(Recipient::Player(seat), DuelEvent::Dealt { cards });
                if state.deck.is_empty() {
                    state.exhausted = true;
                    applied = applied.with_event(Recipient::All, DuelEvent::DeckExhausted);
                }
                applied
            }
            DuelMove::Play { card } => {
                let card = state.hands.entry(seat).or_default().remove(card);
                state.plays_left = state.plays_left.saturating_sub(1);
                self.play(state, view, seat, card)
            }
            DuelMove::EndTurn => {
                state.plays_left = 0;
                Applied::end_turn()
            }
            DuelMove::Pay { amount, mut properties } => {
                let Some(debt) = view.debt else {
                    return Applied::stay();
                };
                let creditor = debt.creditor;
                *state.banks.entry(seat).or_default() -= amount;
                *state.banks.entry(creditor).or_default() += amount;
                let mut applied = Applied::new(Effect::Settled).with_event(
                    Recipient::All,
                    DuelEvent::Paid {
                        from: seat,
                        to: creditor,
                        amount,
                    },
                );

                // Highest position first, so removals never shift a pending one.
                properties.sort_unstable_by(|a, b| b.cmp(a));
                properties.dedup();
                let owned = state.properties.entry(seat).or_default();
                let mut handed = Vec::with_capacity(properties.len());
                for at in properties {
                    if at < owned.len() {
                        handed.push(owned.remove(at));
                    }
                }
                for card in handed {
                    if let Card::Property { name, value } = &card {
                        applied = applied.with_event(
                            Recipient::All,
                            DuelEvent::Surrendered {
                                from: seat,
                                to: creditor,
                                name: name.clone(),
                                value: *value,
                            },
                        );
                    }
                    state.properties.entry(creditor).or_default().push(card);
                }
                applied
            }
        }
    }

    fn check_win(&self, state: &DuelState, view: &MatchView<'_>) -> Verdict {
        if let Some(seat) = view
            .initial_players
            .iter()
            .find(|seat| state.property_count(**seat) >= PROPERTIES_TO_WIN)
        {
            return Verdict::Winner(*seat);
        }
        if !state.exhausted {
            return Verdict::Continue;
        }

        let mut ranked: Vec<(u64, PlayerId)> = view
            .initial_players
            .iter()
            .map(|seat| (state.property_value(*seat), *seat))
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        match ranked.as_slice() {
            [(best, seat), (next, _), ..] if best > next => Verdict::Winner(*seat),
            [(_, seat)] => Verdict::Winner(*seat),
            _ => Verdict::Draw,
        }
    }

    fn can_counter(&self, state: &DuelState, seat: PlayerId, _action: &PendingAction) -> bool {
        state.hand(seat).contains(&Card::JustSayNo)
    }

    fn pay_counter(
        &self,
        state: &mut DuelState,
        seat: PlayerId,
        _card_ref: Option<&str>,
        _action: &PendingAction,
    ) -> Result<Vec<(Recipient, DuelEvent)>, String> {
        let hand = state.hands.entry(seat).or_default();
        let at = hand
            .iter()
            .position(|c| *c == Card::JustSayNo)
            .ok_or("no Just Say No in hand")?;
        state.discard.push(hand.remove(at));
        Ok(vec![(Recipient::All, DuelEvent::CounterPlayed { seat })])
    }

    fn resolve(&self, _state: &mut DuelState, action: &PendingAction) -> Resolution<DuelEvent> {
        let amount = action.amount.unwrap_or(0);
        match action.effect_name() {
            Some(RENT | BIRTHDAY) if amount > 0 => Resolution {
                events: Vec::new(),
                debts: vec![Debt {
                    debtor: action.target,
                    creditor: action.source,
                    amount,
                    origin: action.id,
                }],
            },
            _ => Resolution::default(),
        }
    }

    fn default_move(
        &self,
        state: &DuelState,
        view: &MatchView<'_>,
        seat: PlayerId,
    ) -> Option<DuelMove> {
        if let Some(debt) = view.debt.filter(|d| d.debtor == seat) {
            return Some(liquidate(state, seat, debt.amount));
        }
        if !view.is_turn_of(seat) {
            return None;
        }
        match view.phase.as_str() {
            DRAW => Some(DuelMove::Draw),
            _ => Some(DuelMove::EndTurn),
        }
    }

    fn redact(&self, state: &DuelState, viewer: PlayerId) -> DuelState {
        let mut visible = state.clone();
        visible.deck = vec![Card::FaceDown; state.deck.len()];
        for (seat, hand) in visible.hands.iter_mut() {
            if *seat != viewer {
                *hand = vec![Card::FaceDown; hand.len()];
            }
        }
        visible
    }
}

impl RentDuel {
    fn play(
        &self,
        state: &mut DuelState,
        view: &MatchView<'_>,
        seat: PlayerId,
        card: Card,
    ) -> Applied<DuelEvent> {
        let (effect, amount) = match card {
            Card::Money { value } => {
                *state.banks.entry(seat).or_default() += value;
                let banked = DuelEvent::Banked { seat, value };
                return self.after_play(state).with_event(Recipient::All, banked);
            }
            Card::Property { ref name, value } => {
                let built = DuelEvent::Built {
                    seat,
                    name: name.clone(),
                    value,
                };
                state.properties.entry(seat).or_default().push(card);
                return self.after_play(state).with_event(Recipient::All, built);
            }
            Card::Rent { amount } => (RENT, amount),
            Card::Birthday => (BIRTHDAY, BIRTHDAY_GIFT),
            Card::JustSayNo | Card::FaceDown => return Applied::stay(),
        };

        state.discard.push(card);
        let charges = opponents(view, seat)
            .into_iter()
            .map(|target| Contingent::new(target, effect).with_amount(amount).with_card(effect))
            .collect();
        Applied::new(Effect::Contingent(charges)).with_event(
            Recipient::All,
            DuelEvent::Charged {
                seat,
                effect: effect.to_string(),
                amount,
            },
        )
    }

    fn after_play(&self, state: &DuelState) -> Applied<DuelEvent> {
        if state.plays_left == 0 {
            Applied::end_turn()
        } else {
            Applied::stay()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);

    fn seeded() -> (RentDuel, DuelState) {
        let rules = RentDuel::default();
        let config = DuelConfig {
            seed: Some(7),
            ..Default::default()
        };
        let state = rules.init(&config, &[A, B]);
        (rules, state)
    }

    fn view<'a>(
        phase: &'a Phase,
        players: &'a [PlayerId],
        debt: Option<&'a Debt>,
    ) -> MatchView<'a> {
        MatchView {
            status: MatchStatus::InProgress,
            phase,
            current_turn: Some(A),
            acting: Some(debt.map_or(A, |d| d.debtor)),
            initial_players: players,
            turn_number: 1,
            pending: None,
            responder: None,
            debt,
        }
    }

    fn cash(amount: u64) -> DuelMove {
        DuelMove::Pay {
            amount,
            properties: Vec::new(),
        }
    }

    fn owes_a(amount: u64) -> Debt {
        Debt {
            debtor: B,
            creditor: A,
            amount,
            origin: ActionId(1),
        }
    }

    fn give(state: &mut DuelState, seat: PlayerId, card: Card) -> usize {
        let hand = state.hands.entry(seat).or_default();
        hand.push(card);
        hand.len() - 1
    }

    #[test]
    fn test_init_deals_hands_from_seeded_deck() {
        let (_, state) = seeded();
        assert_eq!(state.hand(A).len(), 5);
        assert_eq!(state.hand(B).len(), 5);
        assert_eq!(state.deck.len(), 30);

        let (_, again) = seeded();
        assert_eq!(state, again, "same seed, same deal");
    }

    #[test]
    fn test_draw_only_in_draw_phase() {
        let (rules, state) = seeded();
        let players = [A, B];
        let draw = Phase::new(DRAW);
        let play = Phase::new(PLAY);

        assert!(rules.validate(&state, &view(&draw, &players, None), A, &DuelMove::Draw).is_ok());
        assert!(rules.validate(&state, &view(&play, &players, None), A, &DuelMove::Draw).is_err());
        assert_eq!(
            rules.validate(&state, &view(&draw, &players, None), A, &DuelMove::EndTurn),
            Err("draw first".to_string())
        );
    }

    #[test]
    fn test_draw_moves_to_play_phase() {
        let (rules, mut state) = seeded();
        let players = [A, B];
        let draw = Phase::new(DRAW);
        let applied = rules.apply(&mut state, &view(&draw, &players, None), A, DuelMove::Draw);

        assert_eq!(applied.effect, Effect::Phase(Phase::new(PLAY)));
        assert_eq!(state.hand(A).len(), 7);
        assert_eq!(state.plays_left, PLAYS_PER_TURN);
        assert!(applied.events.iter().any(|(to, _)| *to == Recipient::Player(A)));
    }

    #[test]
    fn test_rent_charges_every_opponent() {
        let (rules, mut state) = seeded();
        state.plays_left = 3;
        let at = give(&mut state, A, Card::Rent { amount: 4 });
        let players = [A, B];
        let play = Phase::new(PLAY);

        let v = view(&play, &players, None);
        let applied = rules.apply(&mut state, &v, A, DuelMove::Play { card: at });
        let Effect::Contingent(charges) = applied.effect else {
            panic!("expected a contingent effect");
        };
        assert_eq!(charges, vec![Contingent::new(B, RENT).with_amount(4).with_card(RENT)]);
        assert_eq!(state.plays_left, 2);
    }

    #[test]
    fn test_last_play_ends_turn() {
        let (rules, mut state) = seeded();
        state.plays_left = 1;
        let at = give(&mut state, A, Card::money(3));
        let players = [A, B];
        let play = Phase::new(PLAY);

        let v = view(&play, &players, None);
        let applied = rules.apply(&mut state, &v, A, DuelMove::Play { card: at });
        assert_eq!(applied.effect, Effect::EndTurn);
        assert_eq!(state.bank(A), 3);
    }

    #[test]
    fn test_just_say_no_cannot_be_played_on_turn() {
        let (rules, mut state) = seeded();
        state.plays_left = 3;
        let at = give(&mut state, A, Card::JustSayNo);
        let players = [A, B];
        let play = Phase::new(PLAY);
        assert!(rules
            .validate(&state, &view(&play, &players, None), A, &DuelMove::Play { card: at })
            .is_err());
    }

    #[test]
    fn test_payment_must_settle() {
        let (rules, mut state) = seeded();
        state.banks.insert(B, 5);
        let players = [A, B];
        let pay = Phase::pay();
        let debt = owes_a(4);
        let v = view(&pay, &players, Some(&debt));

        assert!(rules.validate(&state, &v, B, &cash(3)).is_err());
        assert!(rules.validate(&state, &v, B, &cash(6)).is_err());
        assert!(rules.validate(&state, &v, B, &DuelMove::EndTurn).is_err());
        assert!(rules.validate(&state, &v, B, &cash(4)).is_ok());

        let applied = rules.apply(&mut state, &v, B, cash(4));
        assert_eq!(applied.effect, Effect::Settled);
        assert_eq!((state.bank(A), state.bank(B)), (4, 1));
    }

    #[test]
    fn test_short_cash_must_hand_over_properties() {
        let (rules, mut state) = seeded();
        state.banks.insert(B, 1);
        state.properties.insert(
            B,
            vec![Card::property("Boardwalk", 4), Card::property("Park Place", 4)],
        );
        let players = [A, B];
        let pay = Phase::pay();
        let debt = owes_a(4);
        let v = view(&pay, &players, Some(&debt));

        assert_eq!(
            rules.validate(&state, &v, B, &cash(1)),
            Err("pay 4 or everything you own".to_string())
        );
        let twice = DuelMove::Pay {
            amount: 1,
            properties: vec![0, 0],
        };
        assert!(rules.validate(&state, &v, B, &twice).is_err());

        let sale = rules.default_move(&state, &v, B).unwrap();
        assert_eq!(
            sale,
            DuelMove::Pay {
                amount: 1,
                properties: vec![0],
            }
        );
        assert!(rules.validate(&state, &v, B, &sale).is_ok());

        let applied = rules.apply(&mut state, &v, B, sale);
        assert_eq!(applied.effect, Effect::Settled);
        assert_eq!((state.bank(A), state.bank(B)), (1, 0));
        assert_eq!(state.built(A), &[Card::property("Boardwalk", 4)]);
        assert_eq!(state.built(B), &[Card::property("Park Place", 4)]);
        assert!(applied.events.iter().any(|(_, e)| matches!(
            e,
            DuelEvent::Surrendered { from: B, to: A, value: 4, .. }
        )));
    }

    #[test]
    fn test_seat_with_nothing_left_may_pay_short() {
        let (rules, mut state) = seeded();
        state.banks.insert(B, 1);
        state.properties.insert(B, vec![Card::property("Baltic Avenue", 1)]);
        let players = [A, B];
        let pay = Phase::pay();
        let debt = owes_a(4);
        let v = view(&pay, &players, Some(&debt));

        let everything = DuelMove::Pay {
            amount: 1,
            properties: vec![0],
        };
        assert_eq!(rules.default_move(&state, &v, B), Some(everything.clone()));
        assert!(rules.validate(&state, &v, B, &everything).is_ok());

        state.banks.insert(B, 0);
        state.properties.insert(B, Vec::new());
        assert!(rules.validate(&state, &v, B, &cash(0)).is_ok());
    }

    #[test]
    fn test_five_properties_win() {
        let (rules, mut state) = seeded();
        let players = [A, B];
        let play = Phase::new(PLAY);
        for n in 0..PROPERTIES_TO_WIN {
            state.properties.entry(B).or_default().push(Card::property("lot", n as u64));
        }
        assert_eq!(rules.check_win(&state, &view(&play, &players, None)), Verdict::Winner(B));
    }

    #[test]
    fn test_exhausted_deck_ranks_portfolios() {
        let (rules, mut state) = seeded();
        let players = [A, B];
        let play = Phase::new(PLAY);
        state.exhausted = true;
        assert_eq!(rules.check_win(&state, &view(&play, &players, None)), Verdict::Draw);

        state.properties.entry(A).or_default().push(Card::property("Boardwalk", 4));
        assert_eq!(rules.check_win(&state, &view(&play, &players, None)), Verdict::Winner(A));
    }

    #[test]
    fn test_counter_spends_just_say_no() {
        let (rules, mut state) = seeded();
        state.hands.insert(B, vec![Card::money(1)]);
        let action = PendingAction {
            id: ActionId(1),
            kind: ActionKind::Effect { name: RENT.into() },
            source: A,
            target: B,
            amount: Some(2),
            card_ref: None,
            status: ActionStatus::Pending,
        };
        assert!(!rules.can_counter(&state, B, &action));

        give(&mut state, B, Card::JustSayNo);
        assert!(rules.can_counter(&state, B, &action));
        rules.pay_counter(&mut state, B, None, &action).unwrap();
        assert_eq!(state.hand(B), &[Card::money(1)]);
        assert_eq!(state.discard.last(), Some(&Card::JustSayNo));
    }

    #[test]
    fn test_redact_hides_opponent_hand_and_deck() {
        let (rules, state) = seeded();
        let seen = rules.redact(&state, A);
        assert_eq!(seen.hand(A), state.hand(A));
        assert!(seen.hand(B).iter().all(|c| *c == Card::FaceDown));
        assert_eq!(seen.hand(B).len(), 5);
        assert!(seen.deck.iter().all(|c| *c == Card::FaceDown));
    }
}
