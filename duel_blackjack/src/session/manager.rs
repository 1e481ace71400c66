//! Match manager for spawning and tracking match actors.

use log::{info, warn};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use super::actor::{MatchActor, MatchHandle};
use super::config::MatchSetup;
use super::errors::{SessionError, SessionResult};
use super::messages::MatchSummary;
use crate::game::{Match, MatchCommand, MatchEvent, MatchId, entities::PlayerId};
use crate::series::RatingStore;

/// Match manager for running many matches side by side
#[derive(Clone, Default)]
pub struct MatchManager {
    /// Active match handles
    matches: Arc<RwLock<HashMap<MatchId, MatchHandle>>>,

    /// Rating store handed to every ranked match
    ratings: Option<Arc<dyn RatingStore>>,
}

impl MatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rating_store(ratings: Arc<dyn RatingStore>) -> Self {
        Self {
            matches: Arc::default(),
            ratings: Some(ratings),
        }
    }

    /// Validates `setup`, then creates and spawns a match actor
    pub async fn create_match(&self, setup: MatchSetup) -> SessionResult<MatchHandle> {
        self.spawn(Match::new(setup)?).await
    }

    /// Spawns an actor around an already built match
    pub async fn spawn(&self, game: Match) -> SessionResult<MatchHandle> {
        let match_id = game.id();
        let match_type = game.config().match_type;
        let (actor, handle) = MatchActor::new(game, self.ratings.clone());

        let mut matches = self.matches.write().await;
        matches.insert(match_id, handle.clone());
        drop(matches);

        tokio::spawn(async move {
            actor.run().await;
        });

        info!("Created and spawned {match_type} match {match_id}");
        Ok(handle)
    }

    pub async fn get(&self, match_id: MatchId) -> Option<MatchHandle> {
        let matches = self.matches.read().await;
        matches.get(&match_id).cloned()
    }

    pub async fn submit(
        &self,
        match_id: MatchId,
        player: impl Into<PlayerId>,
        command: MatchCommand,
    ) -> SessionResult<Vec<MatchEvent>> {
        let handle = self
            .get(match_id)
            .await
            .ok_or(SessionError::MatchNotFound(match_id))?;
        handle.submit(player, command).await
    }

    /// Summaries of every match that still answers
    pub async fn list_matches(&self) -> Vec<MatchSummary> {
        let handles: Vec<MatchHandle> = self.matches.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => warn!("Match {} did not answer: {e}", handle.match_id()),
            }
        }
        summaries
    }

    pub async fn close_match(&self, match_id: MatchId) -> SessionResult<()> {
        let handle = self
            .matches
            .write()
            .await
            .remove(&match_id)
            .ok_or(SessionError::MatchNotFound(match_id))?;
        if let Err(e) = handle.close().await {
            warn!("Match {match_id} was already stopped: {e}");
        }
        info!("Closed match {match_id}");
        Ok(())
    }

    /// Closes finished or dead matches. Returns how many were removed.
    pub async fn reap_finished(&self) -> usize {
        let handles: Vec<MatchHandle> = self.matches.read().await.values().cloned().collect();
        let mut reaped = 0;
        for handle in handles {
            let done = match handle.summary().await {
                Ok(summary) => summary.is_finished,
                Err(_) => true,
            };
            if done && self.close_match(handle.match_id()).await.is_ok() {
                reaped += 1;
            }
        }
        reaped
    }

    pub async fn active_match_count(&self) -> usize {
        self.matches.read().await.len()
    }
}
