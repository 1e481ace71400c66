use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::constants::{self, DECK_SIZE};
use super::functional::{self, HandValue};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Spade,
    Heart,
    Diamond,
    Club,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spade, Suit::Heart, Suit::Diamond, Suit::Club];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Spade => "♠",
            Self::Heart => "♥",
            Self::Diamond => "♦",
            Self::Club => "♣",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values.
pub type Value = u8;

/// A card is a tuple of a value (ace=1 ... king=13) and a suit. Within a
/// single deck the pair is the card's identity.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl Card {
    /// Blackjack points before soft-ace reduction. Aces count 11 here.
    #[must_use]
    pub fn points(&self) -> u32 {
        match self.0 {
            1 => 11,
            v if v >= 10 => 10,
            v => u32::from(v),
        }
    }

    #[must_use]
    pub fn is_ace(&self) -> bool {
        self.0 == 1
    }

    #[must_use]
    pub fn is_ten_valued(&self) -> bool {
        self.0 >= 10
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            1 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        let repr = format!("{value}/{}", self.1);
        write!(f, "{repr:>4}")
    }
}

/// A single 52-card deck. Every round gets a fresh one.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    pub deck_idx: usize,
}

impl Deck {
    /// Deck in suit-major, value-minor order.
    #[must_use]
    pub fn ordered() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL {
            for value in 1u8..=13 {
                cards.push(Card(value, suit));
            }
        }
        Self { cards, deck_idx: 0 }
    }

    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::ordered();
        deck.cards.shuffle(rng);
        deck
    }

    /// Deck that deals `cards` in the given order. Used for deterministic
    /// replays.
    #[must_use]
    pub fn stacked(cards: Vec<Card>) -> Self {
        Self { cards, deck_idx: 0 }
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied();
        if card.is_some() {
            self.deck_idx += 1;
        }
        card
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.deck_idx)
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::ordered()
    }
}

/// Type alias for whole chips. Bets, bankrolls and payouts are all whole
/// chips.
pub type Chips = u32;

/// Signed chip movement (net round result, series deltas).
pub type ChipDelta = i64;

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let mut id: String = s
            .trim()
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        id.truncate(constants::MAX_PLAYER_ID_LENGTH);
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self::new(&value)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Lose,
    Push,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Win => "win",
            Self::Lose => "lose",
            Self::Push => "push",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Hand {
    pub cards: Vec<Card>,
    pub bet: Chips,
    pub stood: bool,
    pub locked: bool,
    pub surrendered: bool,
    pub bust: bool,
    pub doubled: bool,
    pub double_count: u8,
    pub split_depth: u8,
    pub action_count: u32,
    pub natural_blackjack: bool,
    pub outcome: Option<Outcome>,
    pub payout: Chips,
}

impl Hand {
    #[must_use]
    pub fn new(bet: Chips) -> Self {
        Self {
            cards: Vec::with_capacity(4),
            bet,
            stood: false,
            locked: false,
            surrendered: false,
            bust: false,
            doubled: false,
            double_count: 0,
            split_depth: 0,
            action_count: 0,
            natural_blackjack: false,
            outcome: None,
            payout: 0,
        }
    }

    #[must_use]
    pub fn value(&self) -> HandValue {
        functional::evaluate(&self.cards)
    }

    /// Recomputes the derived flags after the cards changed.
    pub fn refresh(&mut self) -> HandValue {
        let value = self.value();
        self.bust = value.is_bust;
        self.natural_blackjack = value.is_natural;
        value
    }

    pub fn push_card(&mut self, card: Card) -> HandValue {
        self.cards.push(card);
        self.refresh()
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    #[must_use]
    pub fn is_playable(&self) -> bool {
        !self.locked && !self.surrendered && !self.bust
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerRoundState {
    pub active_hand_index: usize,
    pub bankroll: Chips,
    pub bankroll_at_round_start: Chips,
    pub hands: Vec<Hand>,
    pub hole_card: Option<Card>,
}

impl PlayerRoundState {
    #[must_use]
    pub fn new(bankroll: Chips) -> Self {
        Self {
            active_hand_index: 0,
            bankroll,
            bankroll_at_round_start: bankroll,
            hands: Vec::new(),
            hole_card: None,
        }
    }

    /// Clears the previous round's cards.
    pub fn reset_round(&mut self) {
        self.active_hand_index = 0;
        self.bankroll_at_round_start = self.bankroll;
        self.hands.clear();
        self.hole_card = None;
    }

    /// Total chips staked across every hand this round.
    #[must_use]
    pub fn committed_stake(&self) -> Chips {
        self.hands.iter().map(|h| h.bet).sum()
    }

    #[must_use]
    pub fn first_playable_from(&self, idx: usize) -> Option<usize> {
        self.hands
            .iter()
            .enumerate()
            .skip(idx)
            .find(|(_, h)| h.is_playable())
            .map(|(i, _)| i)
    }

    #[must_use]
    pub fn active_hand(&self) -> Option<&Hand> {
        self.hands.get(self.active_hand_index)
    }

    #[must_use]
    pub fn has_natural(&self) -> bool {
        self.hands.first().is_some_and(|h| h.natural_blackjack)
    }
}
