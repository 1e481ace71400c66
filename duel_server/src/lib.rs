//! Headless host for duel blackjack matches.
//!
//! Spawns matches through a [`MatchManager`](duel_blackjack::MatchManager),
//! seats autoplay clients in them and exports Prometheus metrics about
//! what happens.

pub mod autoplay;
pub mod config;
pub mod logging;
pub mod metrics;
