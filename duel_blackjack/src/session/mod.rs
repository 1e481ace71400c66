//! Match sessions with an async actor model.
//!
//! Each match runs in its own Tokio task with an mpsc inbox. The actor is
//! the only owner of its [`Match`](crate::game::Match): inputs are applied
//! in arrival order, armed deadlines are turned into timer inputs, and
//! every accepted input is pushed to subscribers as events plus their own
//! view.
//!
//! ## Example
//!
//! ```no_run
//! use duel_blackjack::{MatchConfig, MatchManager, MatchSetup};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = MatchManager::new();
//!     let setup = MatchSetup::casual("alice", "bob", 1_000, MatchConfig::default());
//!     let handle = manager.create_match(setup).await.unwrap();
//!     let view = handle.view("alice").await.unwrap();
//!     assert!(view.is_some());
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;

pub use actor::{MAILBOX_SIZE, MatchActor, MatchHandle};
pub use config::{
    BetConfig, BotDifficulty, MatchConfig, MatchSetup, MatchType, RuleVariants, SeatSetup,
};
pub use errors::{SessionError, SessionResult};
pub use manager::MatchManager;
pub use messages::{MatchMessage, MatchNotification, MatchSummary};
