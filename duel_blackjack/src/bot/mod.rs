//! Bot players with difficulty presets.
//!
//! - Easy: stands on 15, never doubles
//! - Standard: stands on 17, doubles on 10 and 11
//! - Sharp: simplified basic strategy against the opponent's visible card
//!
//! The engine plays a bot seat itself. The same policies also drive the
//! autoplay clients of the server.

pub mod decision;
pub mod models;

pub use decision::{BasicStrategy, BotDecisionContext, BotMove, BotPolicy, BotStrategy, ThresholdStrategy};
pub use models::DifficultyParams;
