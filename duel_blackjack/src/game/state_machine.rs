//! Duel state machine.
//!
//! A [`Match`] is only ever changed through [`Match::reduce`] (or its
//! in-place wrapper [`Match::apply`]). The reducer works on a copy, so a
//! rejected input leaves the match untouched.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, VecDeque},
    fmt,
};
use thiserror::Error;
use uuid::Uuid;

use super::constants::BLACKJACK;
use super::entities::{Card, Chips, Deck, Hand, PlayerId, PlayerRoundState};
use super::functional::{self, ActionLimits};
use super::negotiation::{BetNegotiation, BetRange};
use super::pressure::{PendingPressure, PressureDecision, PressureKind};
use super::settlement::RoundResult;
use super::states::Phase;
use super::timers::{ConnectionState, TimerToken};
use crate::bot::{BotDecisionContext, BotPolicy, BotStrategy};
use crate::series::{RankedSeries, SeriesMarker, SeriesStatus};
use crate::session::config::{BetConfig, MatchConfig, MatchSetup, MatchType};

pub type MatchId = Uuid;

/// Upper bound on consecutive bot steps within one input.
const MAX_BOT_STEPS: usize = 256;

/// Errors returned for rejected inputs
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum MatchError {
    #[error("not your turn")]
    NotYourTurn,
    #[error("waiting on a pressure response")]
    PressurePending,
    #[error("pressure is addressed to your opponent")]
    NotPressureTarget,
    #[error("no pressure to respond to")]
    NoPendingPressure,
    #[error("player is not seated in this match")]
    UnknownPlayer,
    #[error("not allowed during {phase}")]
    InvalidPhase { phase: Phase },
    #[error("hand is locked")]
    HandLocked,
    #[error("can't hit after doubling")]
    HitAfterDouble,
    #[error("double not allowed")]
    DoubleNotAllowed,
    #[error("split not allowed")]
    SplitNotAllowed,
    #[error("ten-valued pairs can't be split")]
    TenValueSplitNotAllowed,
    #[error("surrender only before acting on a hand")]
    SurrenderNotAllowed,
    #[error("hand limit reached")]
    MaxHandsReached,
    #[error("split depth limit reached")]
    MaxSplitDepthReached,
    #[error("need {required} chips, have {available}")]
    InsufficientBankroll { required: Chips, available: Chips },
    #[error("bet {amount} outside {min}..={max}")]
    BetOutOfRange { amount: Chips, min: Chips, max: Chips },
    #[error("bet is fixed for this match")]
    NegotiationDisabled,
    #[error("bet already agreed")]
    NegotiationLocked,
    #[error("opponent has not proposed a bet")]
    NoOpponentProposal,
    #[error("bet is negotiated, not confirmed")]
    ConfirmationNotRequired,
    #[error("bet already confirmed")]
    AlreadyConfirmed,
    #[error("choice already made")]
    AlreadyChosen,
    #[error("choice not available")]
    ChoiceNotAvailable,
    #[error("match is over")]
    MatchFinished,
    #[error("seat is played by a bot")]
    BotControlled,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("invalid match state: internal consistency error")]
    InternalStateError,
    #[error("invalid setup: {0}")]
    InvalidSetup(String),
}

pub type MatchResult<T> = Result<T, MatchError>;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Hit,
    Stand,
    Double,
    Split,
    Surrender,
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Hit => "hit",
            Self::Stand => "stand",
            Self::Double => "double",
            Self::Split => "split",
            Self::Surrender => "surrender",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", content = "amount", rename_all = "snake_case")]
pub enum BetCommand {
    Raise(Chips),
    Lower(Chips),
    Agree,
    Reset,
    Confirm,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextChoice {
    Continue,
    Renegotiate,
    DoubleOrNothing,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "command", content = "args", rename_all = "snake_case")]
pub enum MatchCommand {
    Play(PlayerAction),
    RespondToPressure(PressureDecision),
    Bet(BetCommand),
    ChooseNext(NextChoice),
    Forfeit,
}

/// Everything the reducer accepts: player commands, connection changes and
/// timer firings.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum MatchInput {
    Command {
        player: PlayerId,
        command: MatchCommand,
    },
    Disconnected {
        player: PlayerId,
    },
    Reconnected {
        player: PlayerId,
    },
    TurnExpired {
        token: TimerToken,
    },
    GraceExpired {
        player: PlayerId,
        token: TimerToken,
    },
}

impl MatchInput {
    pub fn command(player: impl Into<PlayerId>, command: MatchCommand) -> Self {
        Self::Command {
            player: player.into(),
            command,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EndReason {
    Forfeit,
    /// Reconnect grace ran out.
    Abandoned,
    BankrollDepleted { player: PlayerId },
    SeriesDecided,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forfeit => write!(f, "forfeit"),
            Self::Abandoned => write!(f, "abandoned"),
            Self::BankrollDepleted { .. } => write!(f, "bankroll_depleted"),
            Self::SeriesDecided => write!(f, "series_decided"),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MatchOutcome {
    pub winner: Option<PlayerId>,
    pub loser: Option<PlayerId>,
    pub reason: EndReason,
    pub rounds_played: u32,
    pub final_bankrolls: Vec<(PlayerId, Chips)>,
    pub series: Option<SeriesStatus>,
}

/// Events emitted by accepted inputs. None of them carries card identities.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    PhaseChanged {
        from: Phase,
        to: Phase,
    },
    BetProposed {
        player: PlayerId,
        amount: Chips,
    },
    BetReset {
        player: PlayerId,
    },
    BetLocked {
        amount: Chips,
    },
    BetConfirmed {
        player: PlayerId,
    },
    RoundDealt {
        round: u32,
        bet: Chips,
    },
    TurnStarted {
        player: PlayerId,
        hand_index: usize,
        expires_at: Option<DateTime<Utc>>,
    },
    ActionTaken {
        player: PlayerId,
        action: PlayerAction,
        hand_index: usize,
    },
    TurnTimedOut {
        player: PlayerId,
    },
    PressureRaised {
        initiator: PlayerId,
        opponent: PlayerId,
        kind: PressureKind,
        delta: Chips,
        affected_hand_indices: Vec<usize>,
    },
    PressureResolved {
        opponent: PlayerId,
        decision: PressureDecision,
        auto: bool,
    },
    RoundResolved(RoundResult),
    ChoiceMade {
        player: PlayerId,
        choice: NextChoice,
    },
    PlayerDisconnected {
        player: PlayerId,
        grace_ends_at: DateTime<Utc>,
    },
    PlayerReconnected {
        player: PlayerId,
    },
    SeriesGameRecorded(SeriesMarker),
    MatchEnded(MatchOutcome),
}

impl MatchEvent {
    /// Wire name of the event, e.g. `round:result`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase:changed",
            Self::BetProposed { .. } => "bet:proposed",
            Self::BetReset { .. } => "bet:reset",
            Self::BetLocked { .. } => "bet:locked",
            Self::BetConfirmed { .. } => "bet:confirmed",
            Self::RoundDealt { .. } => "round:dealt",
            Self::TurnStarted { .. } => "turn:started",
            Self::ActionTaken { .. } => "action:taken",
            Self::TurnTimedOut { .. } => "turn:timeout",
            Self::PressureRaised { .. } => "pressure:raised",
            Self::PressureResolved { .. } => "pressure:resolved",
            Self::RoundResolved(_) => "round:result",
            Self::ChoiceMade { .. } => "choice:made",
            Self::PlayerDisconnected { .. } => "player:disconnected",
            Self::PlayerReconnected { .. } => "player:reconnected",
            Self::SeriesGameRecorded(_) => "series:game",
            Self::MatchEnded(_) => "match:ended",
        }
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::PhaseChanged { from, to } => format!("{from} -> {to}"),
            Self::BetProposed { player, amount } => format!("{player} proposed {amount}"),
            Self::BetReset { player } => format!("{player} reset the proposals"),
            Self::BetLocked { amount } => format!("bet locked at {amount}"),
            Self::BetConfirmed { player } => format!("{player} confirmed the bet"),
            Self::RoundDealt { round, bet } => format!("round {round} dealt at {bet}"),
            Self::TurnStarted {
                player, hand_index, ..
            } => format!("{player} to act on hand {hand_index}"),
            Self::ActionTaken {
                player,
                action,
                hand_index,
            } => format!("{player} {action}s hand {hand_index}"),
            Self::TurnTimedOut { player } => format!("{player} ran out of time"),
            Self::PressureRaised {
                initiator,
                opponent,
                kind,
                delta,
                ..
            } => format!("{initiator}'s {kind} puts {delta} of pressure on {opponent}"),
            Self::PressureResolved {
                opponent,
                decision,
                auto,
            } => {
                let how = if *auto { " (timeout)" } else { "" };
                format!("{opponent} answered pressure with {decision:?}{how}")
            }
            Self::RoundResolved(result) => format!("round {} resolved", result.round),
            Self::ChoiceMade { player, choice } => format!("{player} chose {choice:?}"),
            Self::PlayerDisconnected { player, .. } => format!("{player} disconnected"),
            Self::PlayerReconnected { player } => format!("{player} reconnected"),
            Self::SeriesGameRecorded(marker) => format!("series {} recorded", marker.game),
            Self::MatchEnded(outcome) => match &outcome.winner {
                Some(winner) => format!("{winner} won ({})", outcome.reason),
                None => format!("match ended ({})", outcome.reason),
            },
        };
        write!(f, "{repr}")
    }
}

/// The seat the engine plays itself.
#[derive(Clone, Debug)]
pub struct BotSeat {
    pub player: PlayerId,
    pub policy: BotPolicy,
}

/// A head-to-head blackjack match.
#[derive(Clone, Debug)]
pub struct Match {
    pub(crate) id: MatchId,
    pub(crate) config: MatchConfig,
    pub(crate) seats: [PlayerId; 2],
    pub(crate) bot: Option<BotSeat>,
    pub(crate) series: Option<RankedSeries>,
    pub(crate) phase: Phase,
    pub(crate) round_number: u32,
    pub(crate) players: HashMap<PlayerId, PlayerRoundState>,
    pub(crate) current_turn: Option<PlayerId>,
    pub(crate) first_to_act: Option<PlayerId>,
    pub(crate) turn_expires_at: Option<DateTime<Utc>>,
    pub(crate) turn_token: Option<TimerToken>,
    pub(crate) timer_seq: u64,
    pub(crate) connections: HashMap<PlayerId, ConnectionState>,
    pub(crate) pending_pressure: Option<PendingPressure>,
    pub(crate) negotiation: BetNegotiation,
    pub(crate) bet_confirmed: HashMap<PlayerId, bool>,
    pub(crate) committed_bet: Chips,
    pub(crate) round_result: Option<RoundResult>,
    pub(crate) choices: HashMap<PlayerId, NextChoice>,
    pub(crate) outcome: Option<MatchOutcome>,
    pub(crate) deck: Deck,
    pub(crate) queued_decks: VecDeque<Deck>,
    pub(crate) rng: StdRng,
}

impl Match {
    pub fn new(setup: MatchSetup) -> MatchResult<Self> {
        setup.validate().map_err(MatchError::InvalidSetup)?;
        let MatchSetup { seats, config } = setup;
        let seat_ids = [seats[0].player.clone(), seats[1].player.clone()];

        let bot = seats.iter().find(|s| s.is_bot).map(|s| BotSeat {
            player: s.player.clone(),
            policy: BotPolicy::for_difficulty(config.bot_difficulty),
        });

        let series = match (config.match_type, seats[0].ranked, seats[1].ranked) {
            (MatchType::Ranked, Some(a), Some(b)) => Some(RankedSeries::new(seat_ids.clone(), [a, b])),
            (MatchType::Ranked, _, _) => {
                return Err(MatchError::InvalidSetup(
                    "ranked seats need profiles".to_string(),
                ));
            }
            _ => None,
        };

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let negotiated = matches!(config.bet, BetConfig::Negotiated { .. });
        let initial_bet = config.bet.initial_amount();

        let mut game = Self {
            id: Uuid::new_v4(),
            seats: seat_ids.clone(),
            bot,
            series,
            phase: Phase::RoundInit,
            round_number: 0,
            players: seats
                .iter()
                .map(|s| (s.player.clone(), PlayerRoundState::new(s.bankroll)))
                .collect(),
            current_turn: None,
            first_to_act: None,
            turn_expires_at: None,
            turn_token: None,
            timer_seq: 0,
            connections: seat_ids
                .iter()
                .map(|p| (p.clone(), ConnectionState::default()))
                .collect(),
            pending_pressure: None,
            negotiation: BetNegotiation::new(negotiated, initial_bet),
            bet_confirmed: HashMap::new(),
            committed_bet: initial_bet,
            round_result: None,
            choices: HashMap::new(),
            outcome: None,
            deck: Deck::default(),
            queued_decks: VecDeque::new(),
            rng,
            config,
        };

        let mut events = Vec::new();
        game.drive_bot(Utc::now(), &mut events)?;
        info!(
            "Match {} created: {} vs {} ({})",
            game.id, game.seats[0], game.seats[1], game.config.match_type
        );
        Ok(game)
    }

    /// Computes the match that results from `input` without touching `self`.
    pub fn reduce(
        &self,
        input: MatchInput,
        now: DateTime<Utc>,
    ) -> MatchResult<(Match, Vec<MatchEvent>)> {
        let mut next = self.clone();
        let mut events = Vec::new();
        next.step(input, now, &mut events)?;
        Ok((next, events))
    }

    /// Applies `input` in place. On error nothing changes.
    pub fn apply(&mut self, input: MatchInput, now: DateTime<Utc>) -> MatchResult<Vec<MatchEvent>> {
        let (next, events) = self.reduce(input, now)?;
        *self = next;
        Ok(events)
    }

    /// Makes the next deal use `deck` instead of a freshly shuffled one.
    pub fn queue_deck(&mut self, deck: Deck) {
        self.queued_decks.push_back(deck);
    }

    fn step(
        &mut self,
        input: MatchInput,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        debug!("Match {}: input {input:?}", self.id);
        match input {
            MatchInput::Command { player, command } => {
                self.ensure_human(&player)?;
                if self.phase == Phase::Finished {
                    return Err(MatchError::MatchFinished);
                }
                self.handle_command(&player, command, now, events)?;
            }
            MatchInput::Disconnected { player } => self.on_disconnected(&player, now, events)?,
            MatchInput::Reconnected { player } => self.on_reconnected(&player, events)?,
            MatchInput::TurnExpired { token } => self.on_turn_expired(token, now, events)?,
            MatchInput::GraceExpired { player, token } => {
                self.on_grace_expired(&player, token, events)?;
            }
        }
        self.drive_bot(now, events)
    }

    fn handle_command(
        &mut self,
        player: &PlayerId,
        command: MatchCommand,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let pressure_target = self.pending_pressure.as_ref().map(|p| p.opponent.clone());
        if let Some(target) = pressure_target {
            return match command {
                MatchCommand::RespondToPressure(decision) if &target == player => {
                    self.resolve_pressure(decision, false, now, events)
                }
                MatchCommand::RespondToPressure(_) => Err(MatchError::NotPressureTarget),
                _ => Err(MatchError::PressurePending),
            };
        }

        match command {
            MatchCommand::Play(action) => {
                self.expect_phase(Phase::ActionTurn)?;
                if self.current_turn.as_ref() != Some(player) {
                    return Err(MatchError::NotYourTurn);
                }
                self.play(player, action, now, events)
            }
            MatchCommand::RespondToPressure(_) => Err(MatchError::NoPendingPressure),
            MatchCommand::Bet(bet) => {
                self.expect_phase(Phase::RoundInit)?;
                self.handle_bet(player, bet, now, events)
            }
            MatchCommand::ChooseNext(choice) => {
                self.expect_phase(Phase::Result)?;
                self.record_choice(player, choice, now, events)
            }
            MatchCommand::Forfeit => self.forfeit(player, EndReason::Forfeit, events),
        }
    }

    fn expect_phase(&self, phase: Phase) -> MatchResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(MatchError::InvalidPhase { phase: self.phase })
        }
    }

    pub(crate) fn set_phase(&mut self, to: Phase, events: &mut Vec<MatchEvent>) {
        if self.phase != to {
            let from = self.phase;
            self.phase = to;
            events.push(MatchEvent::PhaseChanged { from, to });
        }
    }

    // === Seats ===

    pub(crate) fn opponent_of(&self, player: &PlayerId) -> MatchResult<PlayerId> {
        match self.seats.iter().position(|p| p == player) {
            Some(seat) => Ok(self.seats[1 - seat].clone()),
            None => Err(MatchError::UnknownPlayer),
        }
    }

    pub(crate) fn player(&self, player: &PlayerId) -> MatchResult<&PlayerRoundState> {
        self.players.get(player).ok_or(MatchError::UnknownPlayer)
    }

    pub(crate) fn player_mut(&mut self, player: &PlayerId) -> MatchResult<&mut PlayerRoundState> {
        self.players.get_mut(player).ok_or(MatchError::UnknownPlayer)
    }

    pub(crate) fn is_bot(&self, player: &PlayerId) -> bool {
        self.bot.as_ref().is_some_and(|b| &b.player == player)
    }

    pub(crate) fn ensure_human(&self, player: &PlayerId) -> MatchResult<()> {
        if !self.seats.contains(player) {
            return Err(MatchError::UnknownPlayer);
        }
        if self.is_bot(player) {
            return Err(MatchError::BotControlled);
        }
        Ok(())
    }

    /// Cards of `owner` that `viewer` can see right now.
    pub(crate) fn visible_cards(&self, owner: &PlayerId, viewer: &PlayerId) -> Vec<Card> {
        let Some(state) = self.players.get(owner) else {
            return Vec::new();
        };
        let conceal = owner != viewer && !self.phase.reveals_hands();
        state
            .hands
            .iter()
            .flat_map(|h| h.cards.iter().copied())
            .filter(|c| !(conceal && Some(*c) == state.hole_card))
            .collect()
    }

    // === Betting ===

    pub(crate) fn bet_range(&self) -> BetRange {
        let bankrolls: Vec<Chips> = self
            .seats
            .iter()
            .filter_map(|p| self.players.get(p).map(|s| s.bankroll))
            .collect();
        BetRange::new(self.config.min_bet, self.config.max_bet_cap, &bankrolls)
    }

    fn both_cover(&self, amount: Chips) -> bool {
        self.seats
            .iter()
            .all(|p| self.players.get(p).is_some_and(|s| s.bankroll >= amount))
    }

    fn handle_bet(
        &mut self,
        player: &PlayerId,
        bet: BetCommand,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let opponent = self.opponent_of(player)?;
        let range = self.bet_range();
        match bet {
            BetCommand::Confirm => {
                if self.negotiation.enabled {
                    return Err(MatchError::ConfirmationNotRequired);
                }
                if self.bet_confirmed.get(player).copied().unwrap_or(false) {
                    return Err(MatchError::AlreadyConfirmed);
                }
                self.bet_confirmed.insert(player.clone(), true);
                events.push(MatchEvent::BetConfirmed {
                    player: player.clone(),
                });
                let all_confirmed = self
                    .seats
                    .iter()
                    .all(|p| self.bet_confirmed.get(p).copied().unwrap_or(false));
                if all_confirmed {
                    self.deal_round(self.config.bet.initial_amount(), now, events)?;
                }
            }
            BetCommand::Raise(amount) | BetCommand::Lower(amount) => {
                self.negotiation.propose(player, amount, &range)?;
                events.push(MatchEvent::BetProposed {
                    player: player.clone(),
                    amount,
                });
            }
            BetCommand::Agree => {
                let amount = self.negotiation.agree(player, &opponent, &range)?;
                events.push(MatchEvent::BetLocked { amount });
                self.deal_round(amount, now, events)?;
            }
            BetCommand::Reset => {
                self.negotiation.reset()?;
                events.push(MatchEvent::BetReset {
                    player: player.clone(),
                });
            }
        }
        Ok(())
    }

    // === Dealing ===

    fn draw(&mut self) -> MatchResult<Card> {
        self.deck.deal_card().ok_or(MatchError::DeckExhausted)
    }

    fn deal_round(
        &mut self,
        bet: Chips,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        if !self.both_cover(bet) {
            return Err(MatchError::InternalStateError);
        }
        self.set_phase(Phase::Deal, events);
        self.round_number += 1;
        self.committed_bet = bet;
        self.round_result = None;
        self.choices.clear();
        self.pending_pressure = None;
        self.deck = match self.queued_decks.pop_front() {
            Some(deck) => deck,
            None => Deck::shuffled(&mut self.rng),
        };

        for state in self.players.values_mut() {
            state.reset_round();
            state.bankroll -= bet;
            state.hands.push(Hand::new(bet));
        }

        let order = [
            self.seats[0].clone(),
            self.seats[1].clone(),
            self.seats[0].clone(),
            self.seats[1].clone(),
        ];
        for (i, player) in order.iter().enumerate() {
            let card = self.draw()?;
            let state = self.player_mut(player)?;
            let hand = state.hands.first_mut().ok_or(MatchError::InternalStateError)?;
            hand.push_card(card);
            if i >= 2 {
                state.hole_card = Some(card);
            }
        }

        info!("Match {}: round {} dealt at {bet}", self.id, self.round_number);
        events.push(MatchEvent::RoundDealt {
            round: self.round_number,
            bet,
        });

        let first = match &self.bot {
            Some(bot) => self.opponent_of(&bot.player)?,
            None if self.round_number % 2 == 1 => self.seats[0].clone(),
            None => self.seats[1].clone(),
        };
        self.first_to_act = Some(first.clone());

        let natural = self.players.values().any(PlayerRoundState::has_natural);
        if natural {
            for state in self.players.values_mut() {
                state.hands.iter_mut().for_each(Hand::lock);
            }
            return self.resolve_round(now, events);
        }

        self.start_turn(&first, now, events);
        Ok(())
    }

    fn enter_round_init(&mut self, events: &mut Vec<MatchEvent>) {
        for state in self.players.values_mut() {
            state.reset_round();
        }
        self.negotiation.reopen(self.committed_bet);
        self.bet_confirmed.clear();
        self.choices.clear();
        self.current_turn = None;
        self.clear_turn_timer();
        self.set_phase(Phase::RoundInit, events);
    }

    // === Turns ===

    fn start_turn(&mut self, player: &PlayerId, now: DateTime<Utc>, events: &mut Vec<MatchEvent>) {
        self.set_phase(Phase::ActionTurn, events);
        self.current_turn = Some(player.clone());
        self.arm_turn_timer(now);
        let hand_index = self
            .players
            .get(player)
            .map_or(0, |s| s.active_hand_index);
        events.push(MatchEvent::TurnStarted {
            player: player.clone(),
            hand_index,
            expires_at: self.turn_expires_at,
        });
    }

    fn action_limits(&self, now: DateTime<Utc>) -> ActionLimits {
        ActionLimits {
            max_doubles_per_hand: self.config.max_doubles_per_hand,
            allow_ten_split_until: self.config.rules.allow_ten_split_until,
            now,
        }
    }

    /// Plays `action` on the active hand of `player`.
    pub(crate) fn play(
        &mut self,
        player: &PlayerId,
        action: PlayerAction,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let limits = self.action_limits(now);
        let state = self.player(player)?;
        functional::check_action(state, action, &limits)?;
        let idx = state.active_hand_index;

        let mut pressure = None;
        match action {
            PlayerAction::Hit => {
                let card = self.draw()?;
                let hand = self.hand_mut(player, idx)?;
                hand.action_count += 1;
                let value = hand.push_card(card);
                if value.is_bust || value.total == BLACKJACK {
                    hand.lock();
                }
            }
            PlayerAction::Stand => {
                let hand = self.hand_mut(player, idx)?;
                hand.action_count += 1;
                hand.stood = true;
                hand.lock();
            }
            PlayerAction::Double => {
                let card = self.draw()?;
                let state = self.player_mut(player)?;
                let hand = state
                    .hands
                    .get_mut(idx)
                    .ok_or(MatchError::InternalStateError)?;
                let added = hand.bet;
                hand.bet += added;
                hand.doubled = true;
                hand.double_count += 1;
                hand.action_count += 1;
                hand.push_card(card);
                hand.lock();
                state.bankroll -= added;
                pressure = Some((PressureKind::Double, added));
            }
            PlayerAction::Split => {
                if self.deck.remaining() < 2 {
                    return Err(MatchError::DeckExhausted);
                }
                let first = self.draw()?;
                let second = self.draw()?;
                let state = self.player_mut(player)?;
                let parent = state
                    .hands
                    .get_mut(idx)
                    .ok_or(MatchError::InternalStateError)?;
                let moved = parent.cards.pop().ok_or(MatchError::InternalStateError)?;
                let bet = parent.bet;
                parent.split_depth += 1;
                parent.action_count = 0;
                let depth = parent.split_depth;
                if parent.push_card(first).total == BLACKJACK {
                    parent.lock();
                }

                let mut sibling = Hand::new(bet);
                sibling.split_depth = depth;
                sibling.push_card(moved);
                if sibling.push_card(second).total == BLACKJACK {
                    sibling.lock();
                }
                state.hands.insert(idx + 1, sibling);
                state.bankroll -= bet;
                pressure = Some((PressureKind::Split, bet));
            }
            PlayerAction::Surrender => {
                let hand = self.hand_mut(player, idx)?;
                hand.action_count += 1;
                hand.surrendered = true;
                hand.lock();
            }
        }

        events.push(MatchEvent::ActionTaken {
            player: player.clone(),
            action,
            hand_index: idx,
        });

        if let Some((kind, delta)) = pressure {
            if self.try_raise_pressure(player, kind, delta, idx, now, events)? {
                return Ok(());
            }
        }
        self.advance_to_next_playable_hand(player, now, events)
    }

    fn hand_mut(&mut self, player: &PlayerId, idx: usize) -> MatchResult<&mut Hand> {
        self.player_mut(player)?
            .hands
            .get_mut(idx)
            .ok_or(MatchError::InternalStateError)
    }

    /// Keeps the turn on `player`'s next unlocked hand, else hands it to the
    /// opponent's first unlocked hand, else resolves the round.
    pub(crate) fn advance_to_next_playable_hand(
        &mut self,
        player: &PlayerId,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let state = self.player_mut(player)?;
        let current = state.active_hand_index;
        if let Some(idx) = state.first_playable_from(current) {
            state.active_hand_index = idx;
            if idx != current {
                self.set_phase(Phase::HandAdvance, events);
            }
            self.start_turn(player, now, events);
            return Ok(());
        }

        self.set_phase(Phase::HandAdvance, events);
        let opponent = self.opponent_of(player)?;
        let opp = self.player_mut(&opponent)?;
        if let Some(idx) = opp.first_playable_from(0) {
            opp.active_hand_index = idx;
            self.start_turn(&opponent, now, events);
            return Ok(());
        }

        self.resolve_round(now, events)
    }

    // === After the round ===

    /// Choices open to a player in the result window.
    pub fn available_choices(&self) -> Vec<NextChoice> {
        if self.config.match_type == MatchType::Ranked {
            return vec![NextChoice::Continue];
        }
        let mut choices = vec![NextChoice::Continue, NextChoice::Renegotiate];
        if self.config.match_type.allows_double_or_nothing() {
            let doubled = self.committed_bet.checked_mul(2);
            if doubled.is_some_and(|d| d <= self.config.max_bet_cap && self.both_cover(d)) {
                choices.push(NextChoice::DoubleOrNothing);
            }
        }
        choices
    }

    pub(crate) fn record_choice(
        &mut self,
        player: &PlayerId,
        choice: NextChoice,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        if self.choices.contains_key(player) {
            return Err(MatchError::AlreadyChosen);
        }
        if !self.available_choices().contains(&choice) {
            return Err(MatchError::ChoiceNotAvailable);
        }
        self.choices.insert(player.clone(), choice);
        events.push(MatchEvent::ChoiceMade {
            player: player.clone(),
            choice,
        });
        if self.seats.iter().all(|p| self.choices.contains_key(p)) {
            self.next_round(now, events)?;
        }
        Ok(())
    }

    fn next_round(&mut self, now: DateTime<Utc>, events: &mut Vec<MatchEvent>) -> MatchResult<()> {
        self.set_phase(Phase::NextRound, events);
        self.clear_turn_timer();
        let picks: Vec<NextChoice> = self
            .seats
            .iter()
            .filter_map(|p| self.choices.get(p).copied())
            .collect();
        let bet = match picks.as_slice() {
            [NextChoice::Continue, NextChoice::Continue] => Some(self.committed_bet),
            [NextChoice::DoubleOrNothing, NextChoice::DoubleOrNothing] => {
                self.committed_bet.checked_mul(2)
            }
            _ => None,
        };
        match bet {
            Some(bet) if self.both_cover(bet) => {
                self.negotiation.target_bet = bet;
                self.deal_round(bet, now, events)
            }
            _ => {
                self.enter_round_init(events);
                Ok(())
            }
        }
    }

    /// Ends the match with `player` as the loser.
    pub(crate) fn forfeit(
        &mut self,
        player: &PlayerId,
        reason: EndReason,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        if self.phase == Phase::Finished {
            return Err(MatchError::MatchFinished);
        }
        let winner = self.opponent_of(player)?;

        if matches!(self.phase, Phase::ActionTurn | Phase::PressureResponse) {
            let opp = self.player_mut(&winner)?;
            let refund = opp.committed_stake();
            opp.bankroll += refund;
            for hand in &mut opp.hands {
                hand.outcome = Some(super::entities::Outcome::Push);
                hand.payout = hand.bet;
                hand.lock();
            }
            let quitter = self.player_mut(player)?;
            for hand in &mut quitter.hands {
                hand.outcome = Some(super::entities::Outcome::Lose);
                hand.payout = 0;
                hand.lock();
            }
            info!(
                "Match {}: {player} forfeited mid-round, {winner} refunded {refund}",
                self.id
            );
        }

        if let Some(series) = self.series.as_mut() {
            if !series.is_finished() {
                series.forfeit(player).map_err(|e| {
                    error!("Match {}: series forfeit failed: {e}", self.id);
                    MatchError::InternalStateError
                })?;
            }
        }
        self.finish(Some(winner), reason, events)
    }

    pub(crate) fn finish(
        &mut self,
        winner: Option<PlayerId>,
        reason: EndReason,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let loser = match &winner {
            Some(w) => Some(self.opponent_of(w)?),
            None => None,
        };
        self.current_turn = None;
        self.pending_pressure = None;
        self.clear_turn_timer();
        for conn in self.connections.values_mut() {
            conn.grace_ends_at = None;
            conn.grace_token = None;
        }

        let outcome = MatchOutcome {
            winner,
            loser,
            reason,
            rounds_played: self.round_number,
            final_bankrolls: self
                .seats
                .iter()
                .map(|p| (p.clone(), self.players.get(p).map_or(0, |s| s.bankroll)))
                .collect(),
            series: self.series.as_ref().map(|s| s.status.clone()),
        };
        self.set_phase(Phase::Finished, events);
        info!(
            "Match {} finished after {} round(s): {}",
            self.id,
            outcome.rounds_played,
            MatchEvent::MatchEnded(outcome.clone())
        );
        self.outcome = Some(outcome.clone());
        events.push(MatchEvent::MatchEnded(outcome));
        Ok(())
    }

    // === Bot seat ===

    fn drive_bot(&mut self, now: DateTime<Utc>, events: &mut Vec<MatchEvent>) -> MatchResult<()> {
        let Some(bot) = self.bot.clone() else {
            return Ok(());
        };
        for _ in 0..MAX_BOT_STEPS {
            let progressed = match self.phase {
                Phase::ActionTurn if self.current_turn.as_ref() == Some(&bot.player) => {
                    self.bot_play(&bot, now, events)?;
                    true
                }
                Phase::RoundInit => self.bot_round_init(&bot, now, events)?,
                Phase::Result if !self.choices.contains_key(&bot.player) => {
                    let choice = bot.policy.choose_next();
                    self.record_choice(&bot.player, choice, now, events)?;
                    true
                }
                _ => false,
            };
            if !progressed {
                return Ok(());
            }
        }
        error!("Match {}: bot {} did not settle", self.id, bot.player);
        Err(MatchError::InternalStateError)
    }

    fn bot_play(
        &mut self,
        bot: &BotSeat,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let player = &bot.player;
        let opponent = self.opponent_of(player)?;
        let visible = self.visible_cards(&opponent, player);
        let state = self.player(player)?;
        let hand = state.active_hand().ok_or(MatchError::InternalStateError)?;
        let ctx = BotDecisionContext {
            hand,
            opponent_visible: &visible,
            bankroll: state.bankroll,
            max_doubles_per_hand: self.config.max_doubles_per_hand,
        };
        let action: PlayerAction = bot.policy.decide(&ctx).into();
        debug!("Match {}: bot {player} plays {action}", self.id);

        match self.play(player, action, now, events) {
            Ok(()) => Ok(()),
            Err(err) if action != PlayerAction::Stand => {
                warn!("Match {}: bot {action} rejected ({err}), standing", self.id);
                self.play(player, PlayerAction::Stand, now, events)
            }
            Err(err) => Err(err),
        }
    }

    /// Confirms or negotiates for the bot. Returns whether it did anything.
    fn bot_round_init(
        &mut self,
        bot: &BotSeat,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<bool> {
        let player = &bot.player;
        if !self.negotiation.enabled {
            if self.bet_confirmed.get(player).copied().unwrap_or(false) {
                return Ok(false);
            }
            self.handle_bet(player, BetCommand::Confirm, now, events)?;
            return Ok(true);
        }
        if self.negotiation.is_locked() {
            return Ok(false);
        }

        let human = self.opponent_of(player)?;
        let command = match (
            self.negotiation.proposal(&human),
            self.negotiation.proposal(player),
        ) {
            (Some(theirs), Some(mine)) if mine > theirs => BetCommand::Lower(theirs),
            (Some(_), _) => BetCommand::Agree,
            (None, None) => {
                let range = self.bet_range();
                BetCommand::Raise(bot.policy.opening_bet(&range, self.negotiation.target_bet))
            }
            (None, Some(_)) => return Ok(false),
        };
        self.handle_bet(player, command, now, events)?;
        Ok(true)
    }

    // === Accessors ===

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn seats(&self) -> &[PlayerId; 2] {
        &self.seats
    }

    pub fn player_state(&self, player: &PlayerId) -> Option<&PlayerRoundState> {
        self.players.get(player)
    }

    pub fn bankroll(&self, player: &PlayerId) -> Option<Chips> {
        self.players.get(player).map(|s| s.bankroll)
    }

    pub fn current_turn(&self) -> Option<&PlayerId> {
        self.current_turn.as_ref()
    }

    pub fn first_to_act(&self) -> Option<&PlayerId> {
        self.first_to_act.as_ref()
    }

    pub fn turn_expires_at(&self) -> Option<DateTime<Utc>> {
        self.turn_expires_at
    }

    pub fn turn_token(&self) -> Option<TimerToken> {
        self.turn_token
    }

    pub fn connection(&self, player: &PlayerId) -> Option<&ConnectionState> {
        self.connections.get(player)
    }

    pub fn pending_pressure(&self) -> Option<&PendingPressure> {
        self.pending_pressure.as_ref()
    }

    pub fn negotiation(&self) -> &BetNegotiation {
        &self.negotiation
    }

    pub fn committed_bet(&self) -> Chips {
        self.committed_bet
    }

    pub fn round_result(&self) -> Option<&RoundResult> {
        self.round_result.as_ref()
    }

    pub fn choice_of(&self, player: &PlayerId) -> Option<NextChoice> {
        self.choices.get(player).copied()
    }

    pub fn series(&self) -> Option<&RankedSeries> {
        self.series.as_ref()
    }

    pub fn outcome(&self) -> Option<&MatchOutcome> {
        self.outcome.as_ref()
    }

    pub fn bot_player(&self) -> Option<&PlayerId> {
        self.bot.as_ref().map(|b| &b.player)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}
