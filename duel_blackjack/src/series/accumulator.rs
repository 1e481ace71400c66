//! Accumulates per-game chip deltas of a ranked series and decides it.

use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{SeriesError, SeriesResult};
use super::models::{
    HudMarker, RankedProfile, SeriesGame, SeriesHud, SeriesMarker, SeriesStatus,
};
use super::rating::{RatingChange, series_rating_changes};
use crate::game::{
    constants::SERIES_TARGET_GAMES,
    entities::{ChipDelta, Chips, PlayerId},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSeries {
    pub series_id: Uuid,
    pub players: [PlayerId; 2],
    pub profiles: [RankedProfile; 2],
    pub stake: Chips,
    pub target_games: u32,
    pub completed_main_games: u32,
    pub cumulative: [ChipDelta; 2],
    pub in_tiebreaker: bool,
    pub next_tiebreaker_round: u32,
    pub markers: Vec<SeriesMarker>,
    pub status: SeriesStatus,
}

impl RankedSeries {
    pub fn new(players: [PlayerId; 2], profiles: [RankedProfile; 2]) -> Self {
        let stake = profiles[0].tier.min(profiles[1].tier).stake();
        Self {
            series_id: Uuid::new_v4(),
            players,
            profiles,
            stake,
            target_games: SERIES_TARGET_GAMES,
            completed_main_games: 0,
            cumulative: [0, 0],
            in_tiebreaker: false,
            next_tiebreaker_round: 1,
            markers: Vec::new(),
            status: SeriesStatus::InProgress,
        }
    }

    fn seat_of(&self, player: &PlayerId) -> SeriesResult<usize> {
        self.players
            .iter()
            .position(|p| p == player)
            .ok_or_else(|| SeriesError::UnknownPlayer(player.clone()))
    }

    fn leader(&self, deltas: [ChipDelta; 2]) -> Option<usize> {
        match deltas[0].cmp(&deltas[1]) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn decide(&mut self, winner: usize) {
        self.status = SeriesStatus::Decided {
            winner: self.players[winner].clone(),
            loser: self.players[1 - winner].clone(),
        };
        info!(
            "Series {} decided for {} after {} marker(s)",
            self.series_id,
            self.players[winner],
            self.markers.len()
        );
    }

    /// Records one finished game. `deltas` are the seats' net chip results.
    pub fn record_game(&mut self, deltas: [ChipDelta; 2]) -> SeriesResult<SeriesMarker> {
        if self.status.is_finished() {
            return Err(SeriesError::AlreadyFinished);
        }

        self.cumulative[0] += deltas[0];
        self.cumulative[1] += deltas[1];

        let game = if self.in_tiebreaker {
            let n = self.next_tiebreaker_round;
            self.next_tiebreaker_round += 1;
            SeriesGame::Tiebreaker(n)
        } else {
            self.completed_main_games += 1;
            SeriesGame::Main(self.completed_main_games)
        };

        let game_winner = self.leader(deltas);
        let marker = SeriesMarker {
            game,
            deltas,
            running: self.cumulative,
            winner: game_winner.map(|seat| self.players[seat].clone()),
        };
        self.markers.push(marker.clone());

        match game {
            SeriesGame::Tiebreaker(_) => {
                if let Some(winner) = game_winner {
                    self.decide(winner);
                }
            }
            SeriesGame::Main(n) if n >= self.target_games => match self.leader(self.cumulative) {
                Some(winner) => self.decide(winner),
                None => {
                    info!("Series {} tied after {n} games", self.series_id);
                    self.in_tiebreaker = true;
                }
            },
            SeriesGame::Main(_) => {}
        }

        Ok(marker)
    }

    /// Ends the series as a loss for `loser`.
    pub fn forfeit(&mut self, loser: &PlayerId) -> SeriesResult<()> {
        if self.status.is_finished() {
            return Err(SeriesError::AlreadyFinished);
        }
        let seat = self.seat_of(loser)?;
        self.status = SeriesStatus::Forfeited {
            winner: self.players[1 - seat].clone(),
            loser: loser.clone(),
        };
        info!("Series {} forfeited by {loser}", self.series_id);
        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// The single rating adjustment of this series, once it is over.
    pub fn rating_changes(&self, ratings: [i32; 2]) -> Option<[RatingChange; 2]> {
        let (winner, _) = self.status.result()?;
        let winner_seat = self.seat_of(winner).ok()?;
        Some(series_rating_changes(
            self.series_id,
            &self.players,
            ratings,
            [self.profiles[0].tier, self.profiles[1].tier],
            winner_seat,
        ))
    }

    pub fn hud_for(&self, viewer: &PlayerId) -> Option<SeriesHud> {
        let you = self.seat_of(viewer).ok()?;
        let them = 1 - you;
        let markers = self
            .markers
            .iter()
            .map(|m| HudMarker {
                game: m.game,
                your_delta: m.deltas[you],
                opponent_delta: m.deltas[them],
                you_won: m.winner.as_ref().map(|w| w == viewer),
            })
            .collect();
        Some(SeriesHud {
            series_id: self.series_id,
            stake: self.stake,
            target_games: self.target_games,
            completed_main_games: self.completed_main_games,
            in_tiebreaker: self.in_tiebreaker,
            your_chip_delta: self.cumulative[you],
            opponent_chip_delta: self.cumulative[them],
            markers,
            status: self.status.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::RankTier;

    fn series() -> RankedSeries {
        RankedSeries::new(
            [PlayerId::new("alice"), PlayerId::new("bob")],
            [
                RankedProfile::new(RankTier::Gold, 1300),
                RankedProfile::new(RankTier::Silver, 1250),
            ],
        )
    }

    #[test]
    fn test_stake_is_lower_tier() {
        assert_eq!(series().stake, 50);
    }

    #[test]
    fn test_decided_after_nine_games() {
        let mut s = series();
        for _ in 0..8 {
            s.record_game([50, -50]).unwrap();
            assert!(!s.is_finished());
        }
        s.record_game([-50, 50]).unwrap();
        assert_eq!(
            s.status,
            SeriesStatus::Decided {
                winner: PlayerId::new("alice"),
                loser: PlayerId::new("bob")
            }
        );
        assert_eq!(s.record_game([0, 0]), Err(SeriesError::AlreadyFinished));
    }

    #[test]
    fn test_tie_goes_to_tiebreaker() {
        let mut s = series();
        for i in 0..9 {
            let d = if i % 2 == 0 { 50 } else { -50 };
            s.record_game([d, -d]).unwrap();
        }
        // Five up, four down for alice: not a tie yet.
        assert!(s.is_finished());

        let mut s = series();
        for _ in 0..9 {
            s.record_game([0, 0]).unwrap();
        }
        assert!(s.in_tiebreaker);
        assert!(!s.is_finished());

        let marker = s.record_game([0, 0]).unwrap();
        assert_eq!(marker.game, SeriesGame::Tiebreaker(1));
        assert!(!s.is_finished());

        let marker = s.record_game([-50, 50]).unwrap();
        assert_eq!(marker.game, SeriesGame::Tiebreaker(2));
        assert_eq!(s.status.result().map(|(w, _)| w.as_str()), Some("bob"));
    }

    #[test]
    fn test_forfeit_ends_series() {
        let mut s = series();
        s.record_game([50, -50]).unwrap();
        s.forfeit(&PlayerId::new("alice")).unwrap();
        assert_eq!(
            s.status,
            SeriesStatus::Forfeited {
                winner: PlayerId::new("bob"),
                loser: PlayerId::new("alice")
            }
        );
        assert!(s.forfeit(&PlayerId::new("bob")).is_err());
    }

    #[test]
    fn test_hud_is_per_viewer() {
        let mut s = series();
        s.record_game([50, -50]).unwrap();
        let alice = s.hud_for(&PlayerId::new("alice")).unwrap();
        let bob = s.hud_for(&PlayerId::new("bob")).unwrap();
        assert_eq!(alice.your_chip_delta, 50);
        assert_eq!(bob.your_chip_delta, -50);
        assert_eq!(bob.markers[0].you_won, Some(false));
        assert!(s.hud_for(&PlayerId::new("carol")).is_none());
    }

    #[test]
    fn test_rating_changes_only_when_finished() {
        let mut s = series();
        assert!(s.rating_changes([1300, 1250]).is_none());
        s.forfeit(&PlayerId::new("bob")).unwrap();
        let [alice, bob] = s.rating_changes([1300, 1250]).unwrap();
        assert!(alice.delta > 0);
        assert!(bob.delta < 0);
    }
}
