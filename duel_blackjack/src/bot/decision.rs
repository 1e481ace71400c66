//! Bot decision-making for the seat the engine plays itself.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use super::models::DifficultyParams;
use crate::game::{
    entities::{Card, Chips, Hand},
    negotiation::BetRange,
    pressure::PressureDecision,
    state_machine::{NextChoice, PlayerAction},
};
use crate::session::config::BotDifficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotMove {
    Hit,
    Stand,
    Double,
}

impl From<BotMove> for PlayerAction {
    fn from(value: BotMove) -> Self {
        match value {
            BotMove::Hit => PlayerAction::Hit,
            BotMove::Stand => PlayerAction::Stand,
            BotMove::Double => PlayerAction::Double,
        }
    }
}

/// What a bot may look at when deciding.
#[derive(Debug, Clone, Copy)]
pub struct BotDecisionContext<'a> {
    pub hand: &'a Hand,
    /// Opponent cards that are face up to this player.
    pub opponent_visible: &'a [Card],
    pub bankroll: Chips,
    pub max_doubles_per_hand: u8,
}

impl BotDecisionContext<'_> {
    pub fn can_double(&self) -> bool {
        self.hand.action_count == 0
            && self.hand.double_count < self.max_doubles_per_hand
            && self.bankroll >= self.hand.bet
    }

    /// Points of the first visible opponent card; a ten when nothing shows.
    pub fn upcard_points(&self) -> u32 {
        self.opponent_visible.first().map_or(10, Card::points)
    }
}

#[enum_dispatch]
pub trait BotStrategy {
    fn decide(&self, ctx: &BotDecisionContext<'_>) -> BotMove;

    fn params(&self) -> &DifficultyParams;

    fn answer_pressure(&self, delta: Chips, bankroll: Chips) -> PressureDecision {
        let ceiling = (bankroll as f32 * self.params().pressure_match_ceiling) as Chips;
        if delta <= bankroll && delta <= ceiling.max(1) {
            PressureDecision::Match
        } else {
            PressureDecision::Surrender
        }
    }

    fn choose_next(&self) -> NextChoice {
        NextChoice::Continue
    }

    fn opening_bet(&self, range: &BetRange, target: Chips) -> Chips {
        target.clamp(range.min, range.max.max(range.min))
    }
}

/// Hits below a fixed total, optionally doubling on a band of hard totals.
#[derive(Debug, Clone)]
pub struct ThresholdStrategy {
    params: DifficultyParams,
}

impl ThresholdStrategy {
    pub fn new(params: DifficultyParams) -> Self {
        Self { params }
    }
}

impl BotStrategy for ThresholdStrategy {
    fn decide(&self, ctx: &BotDecisionContext<'_>) -> BotMove {
        let value = ctx.hand.value();
        if let Some((low, high)) = self.params.double_on {
            if !value.is_soft && (low..=high).contains(&value.total) && ctx.can_double() {
                return BotMove::Double;
            }
        }
        let threshold = if value.is_soft {
            self.params.soft_stand_threshold
        } else {
            self.params.stand_threshold
        };
        if value.total < threshold {
            BotMove::Hit
        } else {
            BotMove::Stand
        }
    }

    fn params(&self) -> &DifficultyParams {
        &self.params
    }
}

/// Simplified basic strategy keyed on the opponent's first visible card.
#[derive(Debug, Clone)]
pub struct BasicStrategy {
    params: DifficultyParams,
}

impl BasicStrategy {
    pub fn new(params: DifficultyParams) -> Self {
        Self { params }
    }
}

impl BotStrategy for BasicStrategy {
    fn decide(&self, ctx: &BotDecisionContext<'_>) -> BotMove {
        let value = ctx.hand.value();
        let up = ctx.upcard_points();
        let weak_up = (2..=6).contains(&up);
        let double_or_hit = if ctx.can_double() {
            BotMove::Double
        } else {
            BotMove::Hit
        };

        if value.is_soft {
            return match value.total {
                t if t >= self.params.soft_stand_threshold => BotMove::Stand,
                18 if up <= 8 => BotMove::Stand,
                13..=17 if (5..=6).contains(&up) => double_or_hit,
                _ => BotMove::Hit,
            };
        }

        match value.total {
            t if t >= self.params.stand_threshold => BotMove::Stand,
            13..=16 if weak_up => BotMove::Stand,
            12 if (4..=6).contains(&up) => BotMove::Stand,
            11 => double_or_hit,
            10 if up <= 9 => double_or_hit,
            9 if (3..=6).contains(&up) => double_or_hit,
            _ => BotMove::Hit,
        }
    }

    fn params(&self) -> &DifficultyParams {
        &self.params
    }
}

#[enum_dispatch(BotStrategy)]
#[derive(Debug, Clone)]
pub enum BotPolicy {
    Threshold(ThresholdStrategy),
    Basic(BasicStrategy),
}

impl BotPolicy {
    pub fn for_difficulty(difficulty: BotDifficulty) -> Self {
        let params = DifficultyParams::from_difficulty(difficulty);
        match difficulty {
            BotDifficulty::Easy | BotDifficulty::Standard => ThresholdStrategy::new(params).into(),
            BotDifficulty::Sharp => BasicStrategy::new(params).into(),
        }
    }
}
