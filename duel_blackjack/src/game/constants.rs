use super::entities::Chips;

pub const DECK_SIZE: usize = 52;
pub const BLACKJACK: u32 = 21;

/// A player can never hold more hands than this in one round.
pub const MAX_HANDS_PER_PLAYER: usize = 4;
pub const MAX_SPLIT_DEPTH: u8 = 3;

/// Share of the bet handed back on a surrendered hand.
pub const SURRENDER_REFUND_PERCENT: Chips = 25;

pub const DEFAULT_TURN_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RECONNECT_GRACE_MS: u64 = 60_000;
/// Longest turn timeout or reconnect grace a match accepts (one day).
pub const MAX_TIMEOUT_MS: u64 = 86_400_000;
pub const DEFAULT_MAX_DOUBLES_PER_HAND: u8 = 1;

pub const DEFAULT_MIN_BET: Chips = 10;
pub const DEFAULT_MAX_BET_CAP: Chips = 5_000;
pub const DEFAULT_TARGET_BET: Chips = 25;
pub const DEFAULT_STARTING_BANKROLL: Chips = 1_000;
/// Ceiling for any bankroll or bet cap a match accepts, so settlement
/// arithmetic stays well inside `Chips`.
pub const MAX_CHIPS: Chips = 1_000_000_000;

/// Main games in a ranked series before tiebreakers.
pub const SERIES_TARGET_GAMES: u32 = 9;

pub const MAX_PLAYER_ID_LENGTH: usize = 32;
