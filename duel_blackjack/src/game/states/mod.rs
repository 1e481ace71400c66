//! Round phases of a duel.
//!
//! `Deal`, `HandAdvance`, `RoundResolve`, `Reveal` and `NextRound` are
//! transient: the reducer passes through them within a single input.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for the bet to be confirmed or negotiated.
    #[default]
    RoundInit,
    Deal,
    /// A player acts on their active hand.
    ActionTurn,
    /// A split or double is waiting on the opponent's answer.
    PressureResponse,
    HandAdvance,
    RoundResolve,
    Reveal,
    /// Both players pick what happens next.
    Result,
    NextRound,
    Finished,
}

impl Phase {
    /// Whether hole cards and exact totals are visible to both players.
    #[must_use]
    pub fn reveals_hands(self) -> bool {
        matches!(
            self,
            Self::RoundResolve | Self::Reveal | Self::Result | Self::NextRound | Self::Finished
        )
    }

    /// Phases that carry a turn deadline.
    #[must_use]
    pub fn is_timed(self) -> bool {
        matches!(self, Self::ActionTurn | Self::PressureResponse | Self::Result)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::RoundInit => "round_init",
            Self::Deal => "deal",
            Self::ActionTurn => "action_turn",
            Self::PressureResponse => "pressure_response",
            Self::HandAdvance => "hand_advance",
            Self::RoundResolve => "round_resolve",
            Self::Reveal => "reveal",
            Self::Result => "result",
            Self::NextRound => "next_round",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_boundary() {
        for phase in [
            Phase::RoundInit,
            Phase::Deal,
            Phase::ActionTurn,
            Phase::PressureResponse,
            Phase::HandAdvance,
        ] {
            assert!(!phase.reveals_hands(), "{phase} must hide");
        }
        for phase in [Phase::RoundResolve, Phase::Reveal, Phase::Result, Phase::Finished] {
            assert!(phase.reveals_hands(), "{phase} must reveal");
        }
    }
}
