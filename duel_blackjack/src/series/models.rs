//! Ranked series data models.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::game::entities::{ChipDelta, Chips, PlayerId};

/// Ranked tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl RankTier {
    /// Fixed per-round stake of a series played at this tier.
    pub fn stake(self) -> Chips {
        match self {
            RankTier::Bronze => 25,
            RankTier::Silver => 50,
            RankTier::Gold => 100,
            RankTier::Platinum => 250,
            RankTier::Diamond => 500,
        }
    }

    /// Multiplier applied to rating losses.
    pub fn loss_scale(self) -> f64 {
        match self {
            RankTier::Bronze => 0.5,
            RankTier::Silver => 0.65,
            RankTier::Gold => 0.8,
            RankTier::Platinum => 0.9,
            RankTier::Diamond => 1.0,
        }
    }
}

impl fmt::Display for RankTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankTier::Bronze => write!(f, "bronze"),
            RankTier::Silver => write!(f, "silver"),
            RankTier::Gold => write!(f, "gold"),
            RankTier::Platinum => write!(f, "platinum"),
            RankTier::Diamond => write!(f, "diamond"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedProfile {
    pub tier: RankTier,
    pub rating: i32,
}

impl RankedProfile {
    pub fn new(tier: RankTier, rating: i32) -> Self {
        Self { tier, rating }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "number", rename_all = "snake_case")]
pub enum SeriesGame {
    Main(u32),
    Tiebreaker(u32),
}

impl fmt::Display for SeriesGame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesGame::Main(n) => write!(f, "game {n}"),
            SeriesGame::Tiebreaker(n) => write!(f, "tiebreaker {n}"),
        }
    }
}

/// One recorded game. Deltas are indexed by seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesMarker {
    pub game: SeriesGame,
    pub deltas: [ChipDelta; 2],
    pub running: [ChipDelta; 2],
    /// `None` when both seats moved the same number of chips.
    pub winner: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeriesStatus {
    InProgress,
    Decided { winner: PlayerId, loser: PlayerId },
    Forfeited { winner: PlayerId, loser: PlayerId },
}

impl SeriesStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, SeriesStatus::InProgress)
    }

    /// `(winner, loser)` once the series is over.
    pub fn result(&self) -> Option<(&PlayerId, &PlayerId)> {
        match self {
            SeriesStatus::InProgress => None,
            SeriesStatus::Decided { winner, loser } | SeriesStatus::Forfeited { winner, loser } => {
                Some((winner, loser))
            }
        }
    }
}

/// A marker from one player's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HudMarker {
    pub game: SeriesGame,
    pub your_delta: ChipDelta,
    pub opponent_delta: ChipDelta,
    pub you_won: Option<bool>,
}

/// Per-viewer series summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesHud {
    pub series_id: Uuid,
    pub stake: Chips,
    pub target_games: u32,
    pub completed_main_games: u32,
    pub in_tiebreaker: bool,
    pub your_chip_delta: ChipDelta,
    pub opponent_chip_delta: ChipDelta,
    pub markers: Vec<HudMarker>,
    pub status: SeriesStatus,
}
