//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use duel_blackjack::{
    MatchConfig,
    constants::DEFAULT_STARTING_BANKROLL,
    entities::Chips,
    session::{BetConfig, BotDifficulty, MatchType},
};
use std::net::SocketAddr;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Prometheus listener; `None` disables the exporter
    pub metrics_bind: Option<SocketAddr>,
    /// Number of matches to host on startup
    pub num_matches: usize,
    /// Match defaults configuration
    pub match_defaults: MatchDefaultsConfig,
    /// Autoplay client behaviour
    pub autoplay: AutoplayConfig,
    /// How often finished matches are reaped
    pub reap_interval_secs: u64,
    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

/// Default match configuration
#[derive(Debug, Clone)]
pub struct MatchDefaultsConfig {
    pub match_type: MatchType,
    /// Starting bankroll of every seat
    pub bankroll: Chips,
    /// Fixed stake; `None` means the stake is negotiated
    pub fixed_bet: Option<Chips>,
    /// Opening proposal of negotiated matches
    pub target_bet: Chips,
    pub min_bet: Chips,
    pub max_bet_cap: Chips,
    pub turn_timeout_ms: u64,
    pub reconnect_grace_ms: u64,
    pub bot_difficulty: BotDifficulty,
}

/// Autoplay client configuration
#[derive(Debug, Clone)]
pub struct AutoplayConfig {
    /// Pause before each autoplay command
    pub delay_ms: u64,
    /// Rounds after which the first seat forfeits an undecided match
    pub max_rounds: u32,
    /// Difficulty the autoplay clients play with
    pub difficulty: BotDifficulty,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `metrics_override` - Optional metrics bind override (from CLI args)
    /// * `num_matches_override` - Optional number of matches override (from CLI args)
    /// * `match_type_override` - Optional match type override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but cannot be understood
    pub fn from_env(
        metrics_override: Option<SocketAddr>,
        num_matches_override: Option<usize>,
        match_type_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let metrics_bind = match metrics_override {
            Some(addr) => Some(addr),
            None => match std::env::var("METRICS_BIND") {
                Ok(v) if v.is_empty() || v == "off" => None,
                Ok(v) => Some(v.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{v}' is not an IP:PORT address"),
                })?),
                Err(_) => None,
            },
        };

        let match_type = match match_type_override.or_else(|| std::env::var("MATCH_TYPE").ok()) {
            Some(v) => parse_match_type(&v).ok_or_else(|| ConfigError::Invalid {
                var: "MATCH_TYPE".to_string(),
                reason: format!("'{v}' is not one of casual, ranked, practice, bot"),
            })?,
            None => MatchType::Bot,
        };

        let bot_difficulty = difficulty_from_env("DEFAULT_BOT_DIFFICULTY")?;
        let fixed_bet = match std::env::var("MATCH_FIXED_BET") {
            Ok(v) if v == "negotiated" => None,
            Ok(v) => Some(v.parse().map_err(|_| ConfigError::Invalid {
                var: "MATCH_FIXED_BET".to_string(),
                reason: "Must be a chip amount or 'negotiated'".to_string(),
            })?),
            Err(_) => Some(25),
        };

        let match_defaults = MatchDefaultsConfig {
            match_type,
            bankroll: parse_env_or("MATCH_BANKROLL", DEFAULT_STARTING_BANKROLL),
            fixed_bet,
            target_bet: parse_env_or("MATCH_TARGET_BET", 50),
            min_bet: parse_env_or("MATCH_MIN_BET", 10),
            max_bet_cap: parse_env_or("MATCH_MAX_BET_CAP", 5_000),
            turn_timeout_ms: parse_env_or("TURN_TIMEOUT_MS", 30_000),
            reconnect_grace_ms: parse_env_or("RECONNECT_GRACE_MS", 60_000),
            bot_difficulty,
        };

        let autoplay = AutoplayConfig {
            delay_ms: parse_env_or("AUTOPLAY_DELAY_MS", 250),
            max_rounds: parse_env_or("AUTOPLAY_MAX_ROUNDS", 50),
            difficulty: difficulty_from_env("AUTOPLAY_DIFFICULTY")?,
        };

        let num_matches = num_matches_override.unwrap_or_else(|| parse_env_or("MAX_MATCHES", 1));

        Ok(ServerConfig {
            metrics_bind,
            num_matches,
            match_defaults,
            autoplay,
            reap_interval_secs: parse_env_or("REAP_INTERVAL_SECS", 5),
            log_filter: std::env::var("LOG_FILTER").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Match configuration every hosted match starts from
    pub fn match_config(&self) -> MatchConfig {
        let defaults = &self.match_defaults;
        MatchConfig {
            match_type: defaults.match_type,
            bet: match defaults.fixed_bet {
                Some(amount) => BetConfig::Fixed(amount),
                None => BetConfig::Negotiated {
                    target: defaults.target_bet,
                },
            },
            min_bet: defaults.min_bet,
            max_bet_cap: defaults.max_bet_cap,
            turn_timeout_ms: defaults.turn_timeout_ms,
            reconnect_grace_ms: defaults.reconnect_grace_ms,
            bot_difficulty: defaults.bot_difficulty,
            ..MatchConfig::default()
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_matches == 0 {
            return Err(ConfigError::Invalid {
                var: "MAX_MATCHES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.reap_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "REAP_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        let config = self.match_config();
        if self.match_defaults.bankroll < config.minimum_stake() {
            return Err(ConfigError::Invalid {
                var: "MATCH_BANKROLL".to_string(),
                reason: format!("Must cover the minimum stake ({})", config.minimum_stake()),
            });
        }

        if self.match_defaults.match_type == MatchType::Ranked
            && self.match_defaults.fixed_bet.is_none()
        {
            return Err(ConfigError::Invalid {
                var: "MATCH_FIXED_BET".to_string(),
                reason: "Ranked matches play at a fixed stake".to_string(),
            });
        }

        config.validate().map_err(|reason| ConfigError::Invalid {
            var: "MATCH_*".to_string(),
            reason,
        })
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

pub fn parse_match_type(s: &str) -> Option<MatchType> {
    match s.to_lowercase().as_str() {
        "casual" => Some(MatchType::Casual),
        "ranked" => Some(MatchType::Ranked),
        "practice" => Some(MatchType::Practice),
        "bot" => Some(MatchType::Bot),
        _ => None,
    }
}

pub fn parse_difficulty(s: &str) -> Option<BotDifficulty> {
    match s.to_lowercase().as_str() {
        "easy" => Some(BotDifficulty::Easy),
        "standard" => Some(BotDifficulty::Standard),
        "sharp" => Some(BotDifficulty::Sharp),
        _ => None,
    }
}

fn difficulty_from_env(key: &str) -> Result<BotDifficulty, ConfigError> {
    match std::env::var(key) {
        Ok(v) => parse_difficulty(&v).ok_or_else(|| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{v}' is not one of easy, standard, sharp"),
        }),
        Err(_) => Ok(BotDifficulty::Standard),
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
