//! Blackjack duel engine - round FSM and game logic.
//!
//! This module provides:
//! - Cards, decks and the hand evaluator
//! - The round state machine driven by [`MatchInput`]s
//! - Pressure betting, bet negotiation and settlement
//! - Turn and disconnect deadlines
//! - Per-viewer projections of a match

pub mod constants;
pub mod entities;
pub mod functional;
pub mod negotiation;
pub mod pressure;
pub mod settlement;
pub mod state_machine;
pub mod states;
pub mod timers;
pub mod view;

pub use negotiation::{BetNegotiation, BetRange, NegotiationStatus};
pub use pressure::{PendingPressure, PressureDecision, PressureKind};
pub use settlement::{HandResult, PlayerRoundResult, RoundResult};
pub use state_machine::{
    BetCommand, BotSeat, EndReason, Match, MatchCommand, MatchError, MatchEvent, MatchId,
    MatchInput, MatchOutcome, MatchResult, NextChoice, PlayerAction,
};
pub use states::Phase;
pub use timers::{ConnectionState, ScheduledTimer, TimerToken};
pub use view::{CardView, HandView, MatchView, NegotiationView, PlayerView, PressureView};
