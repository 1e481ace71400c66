//! Bot tuning presets.

use crate::session::config::BotDifficulty;

/// Bot difficulty parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyParams {
    /// Hard total at which the bot stops hitting
    pub stand_threshold: u32,

    /// Soft total at which the bot stops hitting
    pub soft_stand_threshold: u32,

    /// Hard totals (inclusive) the bot doubles on, if any
    pub double_on: Option<(u32, u32)>,

    /// Largest share of the bankroll the bot puts up to answer pressure
    pub pressure_match_ceiling: f32,
}

impl DifficultyParams {
    /// Timid: stands early, never doubles
    pub fn easy() -> Self {
        Self {
            stand_threshold: 15,
            soft_stand_threshold: 17,
            double_on: None,
            pressure_match_ceiling: 0.10,
        }
    }

    /// Dealer-like: stands on 17, doubles on 10 and 11
    pub fn standard() -> Self {
        Self {
            stand_threshold: 17,
            soft_stand_threshold: 18,
            double_on: Some((10, 11)),
            pressure_match_ceiling: 0.25,
        }
    }

    /// Plays basic strategy against the visible opponent card
    pub fn sharp() -> Self {
        Self {
            stand_threshold: 17,
            soft_stand_threshold: 19,
            double_on: Some((9, 11)),
            pressure_match_ceiling: 0.40,
        }
    }

    pub fn from_difficulty(difficulty: BotDifficulty) -> Self {
        match difficulty {
            BotDifficulty::Easy => Self::easy(),
            BotDifficulty::Standard => Self::standard(),
            BotDifficulty::Sharp => Self::sharp(),
        }
    }
}
