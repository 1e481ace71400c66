//! # Duel Blackjack
//!
//! A head-to-head blackjack engine: two players each play their own hands
//! and are settled against each other, with no dealer.
//!
//! The match itself is a pure reducer. Every player command, connection
//! change and timer firing is a [`MatchInput`]; [`Match::reduce`] returns
//! the next match plus the [`MatchEvent`]s it produced, or a [`MatchError`]
//! and no change at all.
//!
//! ## Round phases
//!
//! - **RoundInit**: the bet is confirmed (fixed) or negotiated
//! - **Deal**: two cards each, the second one face down
//! - **ActionTurn**: hit, stand, double, split or surrender
//! - **PressureResponse**: the opponent matches or surrenders after a split/double
//! - **RoundResolve/Reveal**: every hand is settled against the opponent
//! - **Result**: both players choose continue, renegotiate or double-or-nothing
//! - **Finished**: forfeit, abandonment, depleted bankroll or a decided series
//!
//! ## Core Modules
//!
//! - [`game`]: state machine, entities, evaluator, views
//! - [`session`]: configuration and the async match actor
//! - [`series`]: ranked series accumulator and rating adjustment
//! - [`bot`]: the engine-played seat
//!
//! ## Example
//!
//! ```
//! use duel_blackjack::{Match, MatchConfig, MatchSetup, Phase};
//!
//! let setup = MatchSetup::casual("alice", "bob", 1_000, MatchConfig::default());
//! let game = Match::new(setup).unwrap();
//! assert_eq!(game.phase(), Phase::RoundInit);
//! ```

/// Bot players for the engine-played seat.
pub mod bot;

/// Core game logic, entities, and state machine.
pub mod game;

/// Ranked series and ratings.
pub mod series;

/// Match configuration and async session management.
pub mod session;

pub use game::{
    BetCommand, EndReason, Match, MatchCommand, MatchError, MatchEvent, MatchId, MatchInput,
    MatchOutcome, MatchResult, MatchView, NextChoice, Phase, PlayerAction, PressureDecision,
    constants,
    entities::{self, Card, Chips, Deck, PlayerId, Suit},
    functional,
};
pub use session::{
    MatchConfig, MatchHandle, MatchManager, MatchSetup, MatchType, SessionError,
};
