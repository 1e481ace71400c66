//! Pressure betting: a split or double in a player-vs-player match asks the
//! opponent to match the added stake or surrender the affected hand.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::{Chips, PlayerId};
use super::state_machine::{Match, MatchError, MatchEvent, MatchResult};
use super::states::Phase;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureKind {
    Split,
    Double,
}

impl fmt::Display for PressureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Split => write!(f, "split"),
            Self::Double => write!(f, "double"),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureDecision {
    Match,
    Surrender,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PendingPressure {
    pub initiator: PlayerId,
    pub opponent: PlayerId,
    pub kind: PressureKind,
    /// Stake the opponent has to add to keep the affected hands alive.
    pub delta: Chips,
    pub affected_hand_indices: Vec<usize>,
    pub deadline: Option<DateTime<Utc>>,
}

impl Match {
    fn pressure_enabled(&self) -> bool {
        self.config.match_type.is_pvp() && self.bot.is_none()
    }

    /// Raises pressure after `initiator` split or doubled hand `hand_index`.
    /// Returns whether the round is now waiting on the opponent.
    pub(crate) fn try_raise_pressure(
        &mut self,
        initiator: &PlayerId,
        kind: PressureKind,
        delta: Chips,
        hand_index: usize,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<bool> {
        if !self.pressure_enabled() {
            return Ok(false);
        }
        let opponent = self.opponent_of(initiator)?;
        let opp = self.player(&opponent)?;
        let Some(last) = opp.hands.len().checked_sub(1) else {
            return Ok(false);
        };
        let affected = hand_index.min(last);
        let hand = &opp.hands[affected];
        if hand.surrendered || hand.bust {
            debug!(
                "Match {}: no pressure on {opponent}, hand {affected} already out",
                self.id
            );
            return Ok(false);
        }

        self.arm_turn_timer(now);
        let pressure = PendingPressure {
            initiator: initiator.clone(),
            opponent: opponent.clone(),
            kind,
            delta,
            affected_hand_indices: vec![affected],
            deadline: self.turn_expires_at,
        };
        self.pending_pressure = Some(pressure.clone());
        self.set_phase(Phase::PressureResponse, events);
        events.push(MatchEvent::PressureRaised {
            initiator: pressure.initiator,
            opponent: pressure.opponent,
            kind,
            delta,
            affected_hand_indices: pressure.affected_hand_indices,
        });
        Ok(true)
    }

    /// Applies the opponent's answer and hands play back to the initiator.
    pub(crate) fn resolve_pressure(
        &mut self,
        decision: PressureDecision,
        auto: bool,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let pressure = self
            .pending_pressure
            .take()
            .ok_or(MatchError::NoPendingPressure)?;
        let state = self.player_mut(&pressure.opponent)?;

        match decision {
            PressureDecision::Match => {
                let required = pressure.delta * pressure.affected_hand_indices.len() as Chips;
                if state.bankroll < required {
                    return Err(MatchError::InsufficientBankroll {
                        required,
                        available: state.bankroll,
                    });
                }
                for &idx in &pressure.affected_hand_indices {
                    let hand = state
                        .hands
                        .get_mut(idx)
                        .ok_or(MatchError::InternalStateError)?;
                    state.bankroll -= pressure.delta;
                    hand.bet += pressure.delta;
                }
            }
            PressureDecision::Surrender => {
                for &idx in &pressure.affected_hand_indices {
                    let hand = state
                        .hands
                        .get_mut(idx)
                        .ok_or(MatchError::InternalStateError)?;
                    hand.surrendered = true;
                    hand.lock();
                }
            }
        }

        events.push(MatchEvent::PressureResolved {
            opponent: pressure.opponent,
            decision,
            auto,
        });
        self.advance_to_next_playable_hand(&pressure.initiator, now, events)
    }

    /// Fallback when the opponent lets the deadline pass.
    pub(crate) fn auto_resolve_pressure(
        &mut self,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let pressure = self
            .pending_pressure
            .as_ref()
            .ok_or(MatchError::NoPendingPressure)?;
        let required = pressure.delta * pressure.affected_hand_indices.len() as Chips;
        let decision = if self.player(&pressure.opponent)?.bankroll >= required {
            PressureDecision::Match
        } else {
            PressureDecision::Surrender
        };
        self.resolve_pressure(decision, true, now, events)
    }
}
