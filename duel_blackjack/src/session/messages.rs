//! Match actor message types.

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::config::MatchType;
use crate::game::{
    Match, MatchError, MatchEvent, MatchId, MatchInput, MatchOutcome, MatchView, Phase,
    entities::{Chips, PlayerId},
};

/// Messages that can be sent to a MatchActor
#[derive(Debug)]
pub enum MatchMessage {
    /// Player command or connection change
    Submit {
        input: MatchInput,
        response: oneshot::Sender<Result<Vec<MatchEvent>, MatchError>>,
    },

    /// Get the match as seen by one player
    GetView {
        player: PlayerId,
        response: oneshot::Sender<Option<MatchView>>,
    },

    /// Get a short description of the match
    GetSummary {
        response: oneshot::Sender<MatchSummary>,
    },

    /// Subscribe to per-player updates
    Subscribe {
        player: PlayerId,
        sender: mpsc::Sender<MatchNotification>,
    },

    /// Unsubscribe from updates
    Unsubscribe { player: PlayerId },

    /// Stop the actor
    Close { response: oneshot::Sender<()> },
}

/// Update pushed to a subscriber after every accepted input.
#[derive(Debug, Clone)]
pub struct MatchNotification {
    pub events: Vec<MatchEvent>,
    /// The subscriber's own projection after the events.
    pub view: Option<MatchView>,
}

/// Match summary used for listings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    pub match_type: MatchType,
    pub phase: Phase,
    pub round_number: u32,
    pub players: Vec<(PlayerId, Chips)>,
    pub is_finished: bool,
    pub outcome: Option<MatchOutcome>,
}

impl MatchSummary {
    pub fn of(game: &Match) -> Self {
        Self {
            match_id: game.id(),
            match_type: game.config().match_type,
            phase: game.phase(),
            round_number: game.round_number(),
            players: game
                .seats()
                .iter()
                .map(|p| (p.clone(), game.bankroll(p).unwrap_or(0)))
                .collect(),
            is_finished: game.is_finished(),
            outcome: game.outcome().cloned(),
        }
    }
}
