//! Pure blackjack helpers: hand totals, legality checks and settlement
//! against a reference hand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::constants::{BLACKJACK, MAX_HANDS_PER_PLAYER, MAX_SPLIT_DEPTH, SURRENDER_REFUND_PERCENT};
use super::entities::{Card, Chips, Deck, Hand, Outcome, PlayerRoundState};
use super::state_machine::{MatchError, PlayerAction};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandValue {
    pub total: u32,
    pub is_soft: bool,
    pub is_bust: bool,
    pub is_natural: bool,
}

/// Evaluates a hand. Aces start at 11 and drop to 1 one at a time while the
/// total is over 21; the hand is soft if an ace still counts 11.
#[must_use]
pub fn evaluate(cards: &[Card]) -> HandValue {
    let mut total: u32 = cards.iter().map(Card::points).sum();
    let mut soft_aces = cards.iter().filter(|c| c.is_ace()).count();
    while total > BLACKJACK && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }
    HandValue {
        total,
        is_soft: soft_aces > 0,
        is_bust: total > BLACKJACK,
        is_natural: cards.len() == 2 && total == BLACKJACK,
    }
}

/// Fresh single deck shuffled with the thread-local RNG.
#[must_use]
pub fn build_shuffled_deck() -> Deck {
    Deck::shuffled(&mut rand::rng())
}

/// Per-match limits that gate hand actions.
#[derive(Clone, Copy, Debug)]
pub struct ActionLimits {
    pub max_doubles_per_hand: u8,
    /// Ten-valued pairs may be split while this deadline is in the future.
    pub allow_ten_split_until: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl ActionLimits {
    #[must_use]
    pub fn ten_split_active(&self) -> bool {
        self.allow_ten_split_until.is_some_and(|until| self.now < until)
    }
}

/// Checks whether `action` is legal on the active hand of `state`.
/// Never mutates anything.
pub fn check_action(
    state: &PlayerRoundState,
    action: PlayerAction,
    limits: &ActionLimits,
) -> Result<(), MatchError> {
    let hand = state.active_hand().ok_or(MatchError::InternalStateError)?;
    if !hand.is_playable() {
        return Err(MatchError::HandLocked);
    }
    match action {
        PlayerAction::Hit => {
            if hand.double_count >= 1 {
                return Err(MatchError::HitAfterDouble);
            }
        }
        PlayerAction::Stand => {}
        PlayerAction::Double => {
            if hand.action_count > 0 || hand.double_count >= limits.max_doubles_per_hand {
                return Err(MatchError::DoubleNotAllowed);
            }
            require_bankroll(state, hand.bet)?;
        }
        PlayerAction::Split => {
            let [first, second] = hand.cards.as_slice() else {
                return Err(MatchError::SplitNotAllowed);
            };
            if first.0 != second.0 {
                return Err(MatchError::SplitNotAllowed);
            }
            if state.hands.len() >= MAX_HANDS_PER_PLAYER {
                return Err(MatchError::MaxHandsReached);
            }
            if hand.split_depth >= MAX_SPLIT_DEPTH {
                return Err(MatchError::MaxSplitDepthReached);
            }
            if first.is_ten_valued() && !limits.ten_split_active() {
                return Err(MatchError::TenValueSplitNotAllowed);
            }
            require_bankroll(state, hand.bet)?;
        }
        PlayerAction::Surrender => {
            if hand.action_count > 0 {
                return Err(MatchError::SurrenderNotAllowed);
            }
        }
    }
    Ok(())
}

fn require_bankroll(state: &PlayerRoundState, required: Chips) -> Result<(), MatchError> {
    if state.bankroll < required {
        return Err(MatchError::InsufficientBankroll {
            required,
            available: state.bankroll,
        });
    }
    Ok(())
}

/// The opponent hand every one of a player's hands is compared against.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReferenceHand {
    Standing(HandValue),
    /// Every opponent hand was surrendered. Treated like a bust.
    Forfeited,
}

impl ReferenceHand {
    /// First non-surrendered hand of `opponent`.
    #[must_use]
    pub fn of(opponent: &PlayerRoundState) -> Self {
        opponent
            .hands
            .iter()
            .find(|h| !h.surrendered)
            .map_or(Self::Forfeited, |h| Self::Standing(h.value()))
    }
}

/// Settles one hand, returning its outcome and the chips credited back.
#[must_use]
pub fn settle_hand(hand: &Hand, reference: &ReferenceHand) -> (Outcome, Chips) {
    if hand.surrendered {
        return (Outcome::Lose, surrender_refund(hand.bet));
    }
    let own = hand.value();
    if own.is_bust {
        return (Outcome::Lose, 0);
    }
    let other = match reference {
        ReferenceHand::Forfeited => return (Outcome::Win, hand.bet.saturating_mul(2)),
        ReferenceHand::Standing(v) if v.is_bust => return (Outcome::Win, hand.bet.saturating_mul(2)),
        ReferenceHand::Standing(v) => v,
    };
    match (own.is_natural, other.is_natural) {
        (true, false) => return (Outcome::Win, hand.bet.saturating_mul(2)),
        (false, true) => return (Outcome::Lose, 0),
        _ => {}
    }
    match own.total.cmp(&other.total) {
        std::cmp::Ordering::Greater => (Outcome::Win, hand.bet.saturating_mul(2)),
        std::cmp::Ordering::Equal => (Outcome::Push, hand.bet),
        std::cmp::Ordering::Less => (Outcome::Lose, 0),
    }
}

#[must_use]
pub fn surrender_refund(bet: Chips) -> Chips {
    (u64::from(bet) * u64::from(SURRENDER_REFUND_PERCENT) / 100) as Chips
}
