//! Match configuration and the setup handed over by the matchmaker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{
    constants::{
        DEFAULT_MAX_BET_CAP, DEFAULT_MAX_DOUBLES_PER_HAND, DEFAULT_MIN_BET,
        DEFAULT_RECONNECT_GRACE_MS, DEFAULT_TARGET_BET, DEFAULT_TURN_TIMEOUT_MS, MAX_CHIPS,
        MAX_TIMEOUT_MS,
    },
    entities::{Chips, PlayerId},
};
use crate::series::RankedProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Casual,
    Ranked,
    Practice,
    Bot,
}

impl MatchType {
    /// Two humans with chips at stake.
    pub fn is_pvp(self) -> bool {
        matches!(self, Self::Casual | Self::Ranked)
    }

    pub fn allows_double_or_nothing(self) -> bool {
        matches!(self, Self::Casual | Self::Bot)
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchType::Casual => write!(f, "casual"),
            MatchType::Ranked => write!(f, "ranked"),
            MatchType::Practice => write!(f, "practice"),
            MatchType::Bot => write!(f, "bot"),
        }
    }
}

/// How the stake of a round is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetConfig {
    /// Both players confirm a fixed amount.
    Fixed(Chips),
    /// Players propose and agree on an amount, starting from `target`.
    Negotiated { target: Chips },
}

impl BetConfig {
    pub fn initial_amount(self) -> Chips {
        match self {
            BetConfig::Fixed(amount) => amount,
            BetConfig::Negotiated { target } => target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotDifficulty {
    Easy,
    #[default]
    Standard,
    Sharp,
}

impl std::fmt::Display for BotDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotDifficulty::Easy => write!(f, "easy"),
            BotDifficulty::Standard => write!(f, "standard"),
            BotDifficulty::Sharp => write!(f, "sharp"),
        }
    }
}

/// Time-boxed rule toggles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleVariants {
    /// Ten-valued pairs may be split until this instant.
    pub allow_ten_split_until: Option<DateTime<Utc>>,
}

/// Match configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub match_type: MatchType,

    pub bet: BetConfig,

    /// Smallest legal bet (default: 10)
    pub min_bet: Chips,

    /// Upper bound for negotiated bets and double-or-nothing (default: 5,000)
    pub max_bet_cap: Chips,

    /// Deadline for each turn, pressure answer and result choice
    pub turn_timeout_ms: u64,

    /// How long a disconnected player may stay away before forfeiting
    pub reconnect_grace_ms: u64,

    pub max_doubles_per_hand: u8,

    pub rules: RuleVariants,

    pub bot_difficulty: BotDifficulty,

    /// Seeds the deck shuffler. `None` draws a seed from the OS.
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            match_type: MatchType::Casual,
            bet: BetConfig::Negotiated {
                target: DEFAULT_TARGET_BET,
            },
            min_bet: DEFAULT_MIN_BET,
            max_bet_cap: DEFAULT_MAX_BET_CAP,
            turn_timeout_ms: DEFAULT_TURN_TIMEOUT_MS,
            reconnect_grace_ms: DEFAULT_RECONNECT_GRACE_MS,
            max_doubles_per_hand: DEFAULT_MAX_DOUBLES_PER_HAND,
            rules: RuleVariants::default(),
            bot_difficulty: BotDifficulty::default(),
            seed: None,
        }
    }
}

impl MatchConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.min_bet == 0 {
            return Err("Minimum bet must be at least 1".to_string());
        }

        if self.max_bet_cap < self.min_bet {
            return Err("Max bet cap must not be below the minimum bet".to_string());
        }

        if self.max_bet_cap > MAX_CHIPS {
            return Err(format!("Max bet cap must not exceed {MAX_CHIPS}"));
        }

        let initial = self.bet.initial_amount();
        if initial < self.min_bet || initial > self.max_bet_cap {
            return Err(format!(
                "Initial bet {initial} must be between {} and {}",
                self.min_bet, self.max_bet_cap
            ));
        }

        for timeout in [self.turn_timeout_ms, self.reconnect_grace_ms] {
            if timeout == 0 || timeout > MAX_TIMEOUT_MS {
                return Err(format!("Timeouts must be between 1 and {MAX_TIMEOUT_MS} ms"));
            }
        }

        if self.max_doubles_per_hand == 0 {
            return Err("At least one double per hand must be allowed".to_string());
        }

        if self.match_type == MatchType::Ranked && !matches!(self.bet, BetConfig::Fixed(_)) {
            return Err("Ranked matches play at a fixed stake".to_string());
        }

        Ok(())
    }

    /// Smallest bankroll that can still start a round.
    pub fn minimum_stake(&self) -> Chips {
        match self.bet {
            BetConfig::Fixed(amount) => amount.max(self.min_bet),
            BetConfig::Negotiated { .. } => self.min_bet,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSetup {
    pub player: PlayerId,
    pub bankroll: Chips,
    pub is_bot: bool,
    pub ranked: Option<RankedProfile>,
}

impl SeatSetup {
    pub fn human(player: impl Into<PlayerId>, bankroll: Chips) -> Self {
        Self {
            player: player.into(),
            bankroll,
            is_bot: false,
            ranked: None,
        }
    }

    pub fn bot(player: impl Into<PlayerId>, bankroll: Chips) -> Self {
        Self {
            is_bot: true,
            ..Self::human(player, bankroll)
        }
    }
}

/// Everything needed to start a match: two seats in seat order plus the
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub seats: [SeatSetup; 2],
    pub config: MatchConfig,
}

impl MatchSetup {
    pub fn casual(
        a: impl Into<PlayerId>,
        b: impl Into<PlayerId>,
        bankroll: Chips,
        config: MatchConfig,
    ) -> Self {
        Self {
            seats: [SeatSetup::human(a, bankroll), SeatSetup::human(b, bankroll)],
            config: MatchConfig {
                match_type: MatchType::Casual,
                ..config
            },
        }
    }

    pub fn versus_bot(
        human: impl Into<PlayerId>,
        bankroll: Chips,
        difficulty: BotDifficulty,
        config: MatchConfig,
    ) -> Self {
        Self {
            seats: [
                SeatSetup::human(human, bankroll),
                SeatSetup::bot(format!("bot_{difficulty}"), bankroll),
            ],
            config: MatchConfig {
                match_type: MatchType::Bot,
                bot_difficulty: difficulty,
                ..config
            },
        }
    }

    /// Ranked series at the stake of the lower of the two tiers.
    pub fn ranked(
        a: (impl Into<PlayerId>, RankedProfile),
        b: (impl Into<PlayerId>, RankedProfile),
        bankroll: Chips,
        config: MatchConfig,
    ) -> Self {
        let stake = a.1.tier.min(b.1.tier).stake();
        let seat = |player: PlayerId, profile: RankedProfile| SeatSetup {
            ranked: Some(profile),
            ..SeatSetup::human(player, bankroll)
        };
        Self {
            seats: [seat(a.0.into(), a.1), seat(b.0.into(), b.1)],
            config: MatchConfig {
                match_type: MatchType::Ranked,
                bet: BetConfig::Fixed(stake),
                min_bet: config.min_bet.min(stake),
                ..config
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.config.validate()?;

        let [a, b] = &self.seats;
        if a.player == b.player {
            return Err("Seats must hold two different players".to_string());
        }
        if a.player.as_str().is_empty() || b.player.as_str().is_empty() {
            return Err("Player ids must not be empty".to_string());
        }

        let bots = self.seats.iter().filter(|s| s.is_bot).count();
        match (self.config.match_type, bots) {
            (MatchType::Bot, 1) | (MatchType::Practice, 0 | 1) => {}
            (MatchType::Casual | MatchType::Ranked, 0) => {}
            (match_type, bots) => {
                return Err(format!("{match_type} match cannot seat {bots} bot(s)"));
            }
        }

        if self.config.match_type == MatchType::Ranked
            && self.seats.iter().any(|s| s.ranked.is_none())
        {
            return Err("Ranked seats need a ranked profile".to_string());
        }

        if let Some(seat) = self.seats.iter().find(|s| s.bankroll > MAX_CHIPS) {
            return Err(format!(
                "{} brings more than {MAX_CHIPS} chips",
                seat.player
            ));
        }

        let minimum = self.config.minimum_stake();
        if let Some(seat) = self.seats.iter().find(|s| s.bankroll < minimum) {
            return Err(format!(
                "{} needs at least {minimum} chips to sit down",
                seat.player
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::RankTier;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_bet_range() {
        let config = MatchConfig {
            bet: BetConfig::Fixed(5),
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_match_type_rules() {
        assert!(MatchType::Casual.is_pvp());
        assert!(!MatchType::Bot.is_pvp());
        assert!(MatchType::Bot.allows_double_or_nothing());
        assert!(!MatchType::Ranked.allows_double_or_nothing());
        assert!(!MatchType::Practice.allows_double_or_nothing());
    }

    #[test]
    fn test_ranked_uses_lower_tier_stake() {
        let setup = MatchSetup::ranked(
            ("alice", RankedProfile::new(RankTier::Gold, 1400)),
            ("bob", RankedProfile::new(RankTier::Silver, 1250)),
            1_000,
            MatchConfig::default(),
        );
        assert_eq!(setup.config.bet, BetConfig::Fixed(50));
        assert!(setup.validate().is_ok());
    }

    #[test]
    fn test_setup_rejects_bot_in_casual() {
        let mut setup = MatchSetup::casual("alice", "bob", 500, MatchConfig::default());
        setup.seats[1].is_bot = true;
        assert!(setup.validate().is_err());
    }

    #[test]
    fn test_chip_amounts_are_bounded() {
        let config = MatchConfig {
            bet: BetConfig::Fixed(3_000_000_000),
            max_bet_cap: u32::MAX,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());

        let setup = MatchSetup::casual("alice", "bob", MAX_CHIPS + 1, MatchConfig::default());
        assert!(setup.validate().is_err());
        let setup = MatchSetup::casual("alice", "bob", MAX_CHIPS, MatchConfig::default());
        assert!(setup.validate().is_ok());
    }

    #[test]
    fn test_setup_rejects_poor_seat() {
        let setup = MatchSetup::casual("alice", "bob", 5, MatchConfig::default());
        assert!(setup.validate().is_err());
    }
}
