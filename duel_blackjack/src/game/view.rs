//! Per-viewer projection of a match.
//!
//! Visibility is derived here from (owner, viewer, phase, hole card) and is
//! never stored on the cards themselves. Until the round is resolved the
//! opponent's hole card carries no rank or suit and no exact total leaks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{Card, Chips, Hand, Outcome, PlayerId, PlayerRoundState, Suit, Value};
use super::functional;
use super::negotiation::{BetRange, NegotiationStatus};
use super::pressure::PressureKind;
use super::settlement::RoundResult;
use super::state_machine::{Match, MatchId, MatchOutcome, NextChoice};
use super::states::Phase;
use crate::series::SeriesHud;
use crate::session::config::MatchType;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CardView {
    Shown { value: Value, suit: Suit },
    Concealed,
}

impl From<Card> for CardView {
    fn from(card: Card) -> Self {
        CardView::Shown {
            value: card.0,
            suit: card.1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandView {
    pub cards: Vec<CardView>,
    pub bet: Chips,
    /// Exact total, `None` while a card is concealed.
    pub total: Option<u32>,
    pub total_known: bool,
    /// Total of the face-up cards only.
    pub visible_total: u32,
    pub is_soft: Option<bool>,
    pub stood: bool,
    pub locked: bool,
    pub surrendered: bool,
    pub doubled: bool,
    pub bust: Option<bool>,
    pub natural: Option<bool>,
    pub outcome: Option<Outcome>,
    pub payout: Option<Chips>,
}

impl HandView {
    fn project(hand: &Hand, hole_card: Option<Card>, conceal: bool) -> Self {
        let is_hidden = |card: &Card| conceal && Some(*card) == hole_card;
        let cards = hand
            .cards
            .iter()
            .map(|c| {
                if is_hidden(c) {
                    CardView::Concealed
                } else {
                    CardView::from(*c)
                }
            })
            .collect::<Vec<_>>();
        let visible: Vec<Card> = hand.cards.iter().filter(|c| !is_hidden(c)).copied().collect();
        let visible_value = functional::evaluate(&visible);
        let hides_something = visible.len() != hand.cards.len();
        let value = hand.value();
        let known = !hides_something;

        Self {
            cards,
            bet: hand.bet,
            total: known.then_some(value.total),
            total_known: known,
            visible_total: visible_value.total,
            is_soft: known.then_some(value.is_soft),
            stood: hand.stood,
            locked: hand.locked,
            surrendered: hand.surrendered,
            doubled: hand.doubled,
            bust: (!conceal).then_some(hand.bust),
            natural: (!conceal).then_some(hand.natural_blackjack),
            outcome: hand.outcome,
            payout: hand.outcome.map(|_| hand.payout),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerView {
    pub player: PlayerId,
    pub seat: usize,
    pub is_bot: bool,
    pub bankroll: Chips,
    pub committed_stake: Chips,
    pub active_hand_index: usize,
    pub hands: Vec<HandView>,
    pub connected: bool,
    pub grace_ends_at: Option<DateTime<Utc>>,
    pub bet_confirmed: bool,
    pub has_chosen: bool,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct NegotiationView {
    pub enabled: bool,
    pub status: NegotiationStatus,
    pub your_proposal: Option<Chips>,
    pub opponent_proposal: Option<Chips>,
    pub agreed_amount: Option<Chips>,
    pub target_bet: Chips,
    pub range: BetRange,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PressureView {
    pub initiator: PlayerId,
    pub kind: PressureKind,
    pub delta: Chips,
    pub affected_hand_indices: Vec<usize>,
    pub deadline: Option<DateTime<Utc>>,
    pub awaiting_you: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub match_type: MatchType,
    pub phase: Phase,
    pub round_number: u32,
    pub viewer: PlayerId,
    pub you: PlayerView,
    pub opponent: PlayerView,
    pub current_turn: Option<PlayerId>,
    pub your_turn: bool,
    pub turn_expires_at: Option<DateTime<Utc>>,
    pub turn_timeout_ms: u64,
    /// Doubles allowed on a single hand in this match.
    pub max_doubles_per_hand: u8,
    pub committed_bet: Chips,
    pub can_edit_bet: bool,
    pub can_confirm_bet: bool,
    pub negotiation: NegotiationView,
    pub pressure: Option<PressureView>,
    pub round_result: Option<RoundResult>,
    pub your_choice: Option<NextChoice>,
    pub available_choices: Vec<NextChoice>,
    pub series: Option<SeriesHud>,
    pub outcome: Option<MatchOutcome>,
}

impl MatchView {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Match {
    fn player_view(&self, owner: &PlayerId, viewer: &PlayerId) -> Option<PlayerView> {
        let seat = self.seats.iter().position(|p| p == owner)?;
        let state: &PlayerRoundState = self.players.get(owner)?;
        let conceal = owner != viewer && !self.phase.reveals_hands();
        let conn = self.connections.get(owner).cloned().unwrap_or_default();
        Some(PlayerView {
            player: owner.clone(),
            seat,
            is_bot: self.is_bot(owner),
            bankroll: state.bankroll,
            committed_stake: state.committed_stake(),
            active_hand_index: state.active_hand_index,
            hands: state
                .hands
                .iter()
                .map(|h| HandView::project(h, state.hole_card, conceal))
                .collect(),
            connected: conn.connected,
            grace_ends_at: conn.grace_ends_at,
            bet_confirmed: self.bet_confirmed.get(owner).copied().unwrap_or(false),
            has_chosen: self.choices.contains_key(owner),
        })
    }

    /// What `viewer` is allowed to see. `None` for anyone not seated.
    pub fn view_for(&self, viewer: &PlayerId) -> Option<MatchView> {
        let opponent_id = self.opponent_of(viewer).ok()?;
        let you = self.player_view(viewer, viewer)?;
        let opponent = self.player_view(&opponent_id, viewer)?;
        let in_round_init = self.phase == Phase::RoundInit;

        let negotiation = NegotiationView {
            enabled: self.negotiation.enabled,
            status: self.negotiation.status,
            your_proposal: self.negotiation.proposal(viewer),
            opponent_proposal: self.negotiation.proposal(&opponent_id),
            agreed_amount: self.negotiation.agreed_amount,
            target_bet: self.negotiation.target_bet,
            range: self.bet_range(),
        };

        let pressure = self.pending_pressure.as_ref().map(|p| PressureView {
            initiator: p.initiator.clone(),
            kind: p.kind,
            delta: p.delta,
            affected_hand_indices: p.affected_hand_indices.clone(),
            deadline: p.deadline,
            awaiting_you: &p.opponent == viewer,
        });

        let your_choice = self.choices.get(viewer).copied();
        let available_choices = if self.phase == Phase::Result && your_choice.is_none() {
            self.available_choices()
        } else {
            Vec::new()
        };

        Some(MatchView {
            match_id: self.id,
            match_type: self.config.match_type,
            phase: self.phase,
            round_number: self.round_number,
            viewer: viewer.clone(),
            your_turn: self.phase == Phase::ActionTurn
                && self.current_turn.as_ref() == Some(viewer),
            current_turn: self.current_turn.clone(),
            turn_expires_at: self.turn_expires_at,
            turn_timeout_ms: self.config.turn_timeout_ms,
            max_doubles_per_hand: self.config.max_doubles_per_hand,
            committed_bet: self.committed_bet,
            can_edit_bet: in_round_init && self.negotiation.enabled && !self.negotiation.is_locked(),
            can_confirm_bet: in_round_init && !self.negotiation.enabled && !you.bet_confirmed,
            negotiation,
            pressure,
            round_result: self.round_result.clone(),
            your_choice,
            available_choices,
            series: self.series.as_ref().and_then(|s| s.hud_for(viewer)),
            outcome: self.outcome.clone(),
            you,
            opponent,
        })
    }

    /// Views for both seats, in seat order.
    pub fn views(&self) -> Vec<(PlayerId, MatchView)> {
        self.seats
            .iter()
            .filter_map(|p| self.view_for(p).map(|v| (p.clone(), v)))
            .collect()
    }
}
