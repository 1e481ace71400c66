//! Round settlement: every hand against the opponent's reference hand.

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};

use super::entities::{ChipDelta, Chips, Outcome, PlayerId};
use super::functional::{ReferenceHand, settle_hand};
use super::state_machine::{EndReason, Match, MatchError, MatchEvent, MatchResult};
use super::states::Phase;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HandResult {
    pub bet: Chips,
    pub total: u32,
    pub surrendered: bool,
    pub bust: bool,
    pub natural: bool,
    pub outcome: Outcome,
    pub payout: Chips,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerRoundResult {
    pub player: PlayerId,
    /// Chips put at risk this round across every hand.
    pub stake: Chips,
    pub payout: Chips,
    pub net_delta: ChipDelta,
    pub bankroll_before: Chips,
    pub bankroll_after: Chips,
    /// Sign of the bankroll change.
    pub outcome: Outcome,
    pub hands: Vec<HandResult>,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RoundResult {
    pub round: u32,
    pub bet: Chips,
    pub players: Vec<PlayerRoundResult>,
}

impl RoundResult {
    pub fn for_player(&self, player: &PlayerId) -> Option<&PlayerRoundResult> {
        self.players.iter().find(|r| &r.player == player)
    }
}

fn headline(delta: ChipDelta) -> Outcome {
    match delta.signum() {
        1 => Outcome::Win,
        -1 => Outcome::Lose,
        _ => Outcome::Push,
    }
}

impl Match {
    /// Settles the round, records it and opens the result window (or ends
    /// the match).
    pub(crate) fn resolve_round(
        &mut self,
        now: DateTime<Utc>,
        events: &mut Vec<MatchEvent>,
    ) -> MatchResult<()> {
        self.set_phase(Phase::RoundResolve, events);
        self.current_turn = None;
        self.pending_pressure = None;
        self.clear_turn_timer();

        let [a, b] = self.seats.clone();
        let reference_for_a = ReferenceHand::of(self.player(&b)?);
        let reference_for_b = ReferenceHand::of(self.player(&a)?);

        let mut players = Vec::with_capacity(2);
        for (player, reference) in [(a, reference_for_a), (b, reference_for_b)] {
            let state = self.player_mut(&player)?;
            let stake = state.committed_stake();
            let mut payout: Chips = 0;
            let mut hands = Vec::with_capacity(state.hands.len());
            for hand in &mut state.hands {
                let (outcome, credited) = settle_hand(hand, &reference);
                hand.outcome = Some(outcome);
                hand.payout = credited;
                hand.lock();
                payout = payout.saturating_add(credited);
                let value = hand.value();
                hands.push(HandResult {
                    bet: hand.bet,
                    total: value.total,
                    surrendered: hand.surrendered,
                    bust: value.is_bust,
                    natural: value.is_natural,
                    outcome,
                    payout: credited,
                });
            }
            state.bankroll = state.bankroll.saturating_add(payout);
            let net_delta = ChipDelta::from(payout) - ChipDelta::from(stake);
            let bankroll_change =
                ChipDelta::from(state.bankroll) - ChipDelta::from(state.bankroll_at_round_start);
            if bankroll_change != net_delta {
                error!(
                    "Match {}: bankroll drift for {player}: {bankroll_change} vs {net_delta}",
                    self.id
                );
                return Err(MatchError::InternalStateError);
            }
            players.push(PlayerRoundResult {
                player,
                stake,
                payout,
                net_delta,
                bankroll_before: state.bankroll_at_round_start,
                bankroll_after: state.bankroll,
                outcome: headline(bankroll_change),
                hands,
            });
        }

        let result = RoundResult {
            round: self.round_number,
            bet: self.committed_bet,
            players,
        };
        info!(
            "Match {} round {} resolved: {}",
            self.id,
            result.round,
            result
                .players
                .iter()
                .map(|p| format!("{} {:+}", p.player, p.net_delta))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.round_result = Some(result.clone());
        events.push(MatchEvent::RoundResolved(result.clone()));
        self.set_phase(Phase::Reveal, events);

        if let Some(series) = self.series.as_mut() {
            let deltas = [result.players[0].net_delta, result.players[1].net_delta];
            let marker = series.record_game(deltas).map_err(|e| {
                error!("Match {}: series rejected round: {e}", self.id);
                MatchError::InternalStateError
            })?;
            events.push(MatchEvent::SeriesGameRecorded(marker));
            if let Some((winner, _)) = series.status.result() {
                let winner = winner.clone();
                return self.finish(Some(winner), EndReason::SeriesDecided, events);
            }
        }

        if let Some(depleted) = self.depleted_player() {
            let winner = self.opponent_of(&depleted)?;
            if let Some(series) = self.series.as_mut() {
                series.forfeit(&depleted).map_err(|e| {
                    error!("Match {}: series forfeit failed: {e}", self.id);
                    MatchError::InternalStateError
                })?;
            }
            return self.finish(Some(winner), EndReason::BankrollDepleted { player: depleted }, events);
        }

        self.open_result_window(now, events);
        Ok(())
    }

    /// The first seat that can no longer cover the smallest stake.
    fn depleted_player(&self) -> Option<PlayerId> {
        let minimum = self.config.minimum_stake();
        self.seats
            .iter()
            .find(|p| self.players.get(*p).is_none_or(|s| s.bankroll < minimum))
            .cloned()
    }

    fn open_result_window(&mut self, now: DateTime<Utc>, events: &mut Vec<MatchEvent>) {
        self.choices.clear();
        self.set_phase(Phase::Result, events);
        self.arm_turn_timer(now);
    }
}
