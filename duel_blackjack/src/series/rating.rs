//! Elo rating adjustment applied once per finished series.

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::errors::{RatingError, RatingResult};
use super::models::RankTier;
use crate::game::entities::PlayerId;

pub const K_FACTOR: f64 = 32.0;
pub const DEFAULT_RATING: i32 = 1200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    pub series_id: Uuid,
    pub player: PlayerId,
    pub before: i32,
    pub after: i32,
    pub delta: i32,
}

/// Expected score of a player rated `rating` against `opponent`.
pub fn expected_score(rating: i32, opponent: i32) -> f64 {
    1.0 / (1.0 + 10f64.powf(f64::from(opponent - rating) / 400.0))
}

/// Rating deltas for one finished series. Wins are unscaled, losses are
/// scaled by the loser's tier.
pub fn series_rating_changes(
    series_id: Uuid,
    players: &[PlayerId; 2],
    ratings: [i32; 2],
    tiers: [RankTier; 2],
    winner: usize,
) -> [RatingChange; 2] {
    let loser = 1 - winner;
    let win_delta = (K_FACTOR * (1.0 - expected_score(ratings[winner], ratings[loser]))).round();
    let loss_delta = (K_FACTOR * -expected_score(ratings[loser], ratings[winner])
        * tiers[loser].loss_scale())
    .round();

    let mut deltas = [0i32; 2];
    deltas[winner] = win_delta as i32;
    deltas[loser] = loss_delta as i32;

    [0, 1].map(|seat| RatingChange {
        series_id,
        player: players[seat].clone(),
        before: ratings[seat],
        after: ratings[seat] + deltas[seat],
        delta: deltas[seat],
    })
}

/// Where ratings live. Applying the same series twice must not move a rating.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Stored rating, or `None` for a player the store has never rated.
    async fn rating(&self, player: &PlayerId) -> RatingResult<Option<i32>>;

    async fn apply_series_delta(&self, changes: &[RatingChange]) -> RatingResult<()>;
}

#[derive(Debug, Default)]
struct RatingBook {
    ratings: HashMap<PlayerId, i32>,
    applied: HashSet<Uuid>,
}

/// Process-local rating store.
#[derive(Debug, Default)]
pub struct InMemoryRatingStore {
    book: Mutex<RatingBook>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_rating(&self, player: PlayerId, rating: i32) {
        self.book.lock().await.ratings.insert(player, rating);
    }

    pub async fn is_applied(&self, series_id: Uuid) -> bool {
        self.book.lock().await.applied.contains(&series_id)
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn rating(&self, player: &PlayerId) -> RatingResult<Option<i32>> {
        let book = self.book.lock().await;
        Ok(book.ratings.get(player).copied())
    }

    async fn apply_series_delta(&self, changes: &[RatingChange]) -> RatingResult<()> {
        let Some(series_id) = changes.first().map(|c| c.series_id) else {
            return Ok(());
        };

        let mut book = self.book.lock().await;
        if !book.applied.insert(series_id) {
            debug!("Series {series_id} already applied, skipping");
            return Err(RatingError::DuplicateApplication(series_id));
        }
        for change in changes {
            let rating = book.ratings.entry(change.player.clone()).or_insert(change.before);
            *rating += change.delta;
            info!(
                "Rating for {} moved by {} to {} (series {series_id})",
                change.player, change.delta, *rating
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> [PlayerId; 2] {
        [PlayerId::new("alice"), PlayerId::new("bob")]
    }

    #[test]
    fn test_even_match_diamond_loser() {
        let [w, l] = series_rating_changes(
            Uuid::new_v4(),
            &players(),
            [1200, 1200],
            [RankTier::Diamond, RankTier::Diamond],
            0,
        );
        assert_eq!(w.delta, 16);
        assert_eq!(l.delta, -16);
        assert_eq!(l.after, 1184);
    }

    #[test]
    fn test_loss_scaled_by_loser_tier() {
        let [w, l] = series_rating_changes(
            Uuid::new_v4(),
            &players(),
            [1200, 1200],
            [RankTier::Gold, RankTier::Bronze],
            0,
        );
        assert_eq!(w.delta, 16);
        assert_eq!(l.delta, -8);
    }

    #[test]
    fn test_underdog_gains_more() {
        let [_, underdog] = series_rating_changes(
            Uuid::new_v4(),
            &players(),
            [1400, 1200],
            [RankTier::Diamond, RankTier::Diamond],
            1,
        );
        assert!(underdog.delta > 16);
    }

    #[tokio::test]
    async fn test_store_applies_series_once() {
        let store = InMemoryRatingStore::new();
        let changes = series_rating_changes(
            Uuid::new_v4(),
            &players(),
            [1200, 1200],
            [RankTier::Diamond, RankTier::Diamond],
            0,
        );
        store.apply_series_delta(&changes).await.unwrap();
        assert!(matches!(
            store.apply_series_delta(&changes).await,
            Err(RatingError::DuplicateApplication(_))
        ));
        assert_eq!(store.rating(&PlayerId::new("alice")).await.unwrap(), Some(1216));
        assert_eq!(store.rating(&PlayerId::new("bob")).await.unwrap(), Some(1184));
    }

    #[tokio::test]
    async fn test_unrated_player_starts_from_change_baseline() {
        let store = InMemoryRatingStore::new();
        assert_eq!(store.rating(&PlayerId::new("alice")).await.unwrap(), None);
        let changes = series_rating_changes(
            Uuid::new_v4(),
            &players(),
            [1400, 1200],
            [RankTier::Diamond, RankTier::Diamond],
            0,
        );
        store.apply_series_delta(&changes).await.unwrap();
        assert_eq!(
            store.rating(&PlayerId::new("alice")).await.unwrap(),
            Some(changes[0].after)
        );
    }
}
