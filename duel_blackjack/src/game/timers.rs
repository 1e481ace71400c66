//! Turn deadlines and disconnect grace periods.
//!
//! The engine never sleeps. It records deadlines plus a token per arming;
//! the owner of the match delivers `TurnExpired`/`GraceExpired` inputs back
//! with the token once the instant has passed. A token that no longer
//! matches the armed one is ignored.

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::constants::MAX_TIMEOUT_MS;
use super::entities::PlayerId;
use super::state_machine::{
    EndReason, Match, MatchError, MatchEvent, MatchInput, MatchResult, NextChoice, PlayerAction,
};
use super::states::Phase;
use crate::session::config::MatchType;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TimerToken {
    pub round: u32,
    pub seq: u64,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub grace_ends_at: Option<DateTime<Utc>>,
    pub grace_token: Option<TimerToken>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            connected: true,
            grace_ends_at: None,
            grace_token: None,
        }
    }
}

/// An input the match wants delivered at `at`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledTimer {
    pub at: DateTime<Utc>,
    pub input: MatchInput,
}

fn millis(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(MAX_TIMEOUT_MS) as i64)
}

impl Match {
    fn next_token(&mut self) -> TimerToken {
        self.timer_seq += 1;
        TimerToken {
            round: self.round_number,
            seq: self.timer_seq,
        }
    }

    pub(crate) fn arm_turn_timer(&mut self, now: DateTime<Utc>) {
        let token = self.next_token();
        self.turn_token = Some(token);
        self.turn_expires_at = Some(now + millis(self.config.turn_timeout_ms));
    }

    pub(crate) fn clear_turn_timer(&mut self) {
        self.turn_token = None;
        self.turn_expires_at = None;
    }

    /// Every deadline currently armed.
    pub fn pending_timers(&self) -> Vec<ScheduledTimer> {
        let mut timers = Vec::new();
        if let (true, Some(at), Some(token)) =
            (self.phase.is_timed(), self.turn_expires_at, self.turn_token)
        {
            timers.push(ScheduledTimer {
                at,
                input: MatchInput::TurnExpired { token },
            });
        }
        for player in &self.seats {
            let Some(conn) = self.connections.get(player) else {
                continue;
            };
            if let (false, Some(at), Some(token)) =
                (conn.connected, conn.grace_ends_at, conn.grace_token)
            {
                timers.push(ScheduledTimer {
                    at,
                    input: MatchInput::GraceExpired {
                        player: player.clone(),
                        token,
                    },
                });
            }
        }
        timers
    }

    pub fn next_timer(&self) -> Option<ScheduledTimer> {
        self.pending_timers().into_iter().min_by_key(|t| t.at)
    }

    pub(crate) fn on_disconnected(
        &mut self,
        player: &PlayerId,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        self.ensure_human(player)?;
        if self.phase == Phase::Finished {
            return Err(MatchError::MatchFinished);
        }
        if self.connections.get(player).is_some_and(|c| !c.connected) {
            return Ok(());
        }
        let token = self.next_token();
        let grace = millis(self.config.reconnect_grace_ms);
        let conn = self.connections.entry(player.clone()).or_default();
        conn.connected = false;
        conn.grace_ends_at = Some(now + grace);
        conn.grace_token = Some(token);
        info!("Match {}: {player} disconnected", self.id);
        events.push(MatchEvent::PlayerDisconnected {
            player: player.clone(),
            grace_ends_at: now + grace,
        });
        Ok(())
    }

    pub(crate) fn on_reconnected(
        &mut self,
        player: &PlayerId,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        self.ensure_human(player)?;
        let conn = self.connections.entry(player.clone()).or_default();
        if conn.connected {
            return Ok(());
        }
        *conn = ConnectionState::default();
        info!("Match {}: {player} reconnected", self.id);
        events.push(MatchEvent::PlayerReconnected {
            player: player.clone(),
        });
        Ok(())
    }

    pub(crate) fn on_grace_expired(
        &mut self,
        player: &PlayerId,
        token: TimerToken,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        let live = self
            .connections
            .get(player)
            .is_some_and(|c| !c.connected && c.grace_token == Some(token));
        if !live || self.phase == Phase::Finished {
            debug!("Match {}: stale grace token {token:?} for {player}", self.id);
            return Ok(());
        }
        info!("Match {}: {player} did not return in time", self.id);
        self.forfeit(player, EndReason::Abandoned, events)
    }

    pub(crate) fn on_turn_expired(
        &mut self,
        token: TimerToken,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        if self.turn_token != Some(token) {
            debug!("Match {}: stale turn token {token:?}", self.id);
            return Ok(());
        }
        match self.phase {
            Phase::ActionTurn => {
                let player = self
                    .current_turn
                    .clone()
                    .ok_or(MatchError::InternalStateError)?;
                events.push(MatchEvent::TurnTimedOut {
                    player: player.clone(),
                });
                self.play(&player, PlayerAction::Stand, now, events)
            }
            Phase::PressureResponse => {
                if let Some(pressure) = &self.pending_pressure {
                    events.push(MatchEvent::TurnTimedOut {
                        player: pressure.opponent.clone(),
                    });
                }
                self.auto_resolve_pressure(now, events)
            }
            Phase::Result => {
                let fallback = if self.config.match_type == MatchType::Ranked {
                    NextChoice::Continue
                } else {
                    NextChoice::Renegotiate
                };
                let missing: Vec<PlayerId> = self
                    .seats
                    .iter()
                    .filter(|p| !self.choices.contains_key(*p))
                    .cloned()
                    .collect();
                for player in missing {
                    if self.phase != Phase::Result {
                        break;
                    }
                    events.push(MatchEvent::TurnTimedOut {
                        player: player.clone(),
                    });
                    self.record_choice(&player, fallback, now, events)?;
                }
                Ok(())
            }
            _ => {
                debug!("Match {}: turn timer fired in {}", self.id, self.phase);
                self.clear_turn_timer();
                Ok(())
            }
        }
    }
}
