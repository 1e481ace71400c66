//! Two-party bet negotiation held before a round is dealt.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::entities::{Chips, PlayerId};
use super::state_machine::MatchError;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    #[default]
    Open,
    Locked,
}

/// Inclusive range of acceptable bets.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BetRange {
    pub min: Chips,
    pub max: Chips,
}

impl BetRange {
    /// `[min_bet, min(cap, smallest bankroll)]`.
    #[must_use]
    pub fn new(min_bet: Chips, cap: Chips, bankrolls: &[Chips]) -> Self {
        let smallest = bankrolls.iter().copied().min().unwrap_or(0);
        Self {
            min: min_bet,
            max: cap.min(smallest),
        }
    }

    #[must_use]
    pub fn contains(&self, amount: Chips) -> bool {
        self.min <= amount && amount <= self.max
    }

    pub fn check(&self, amount: Chips) -> Result<(), MatchError> {
        if self.contains(amount) {
            Ok(())
        } else {
            Err(MatchError::BetOutOfRange {
                amount,
                min: self.min,
                max: self.max,
            })
        }
    }
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BetNegotiation {
    pub enabled: bool,
    pub proposals: HashMap<PlayerId, Chips>,
    pub agreed_amount: Option<Chips>,
    /// The bet the previous round was played at.
    pub target_bet: Chips,
    pub status: NegotiationStatus,
}

impl BetNegotiation {
    #[must_use]
    pub fn new(enabled: bool, target_bet: Chips) -> Self {
        Self {
            enabled,
            proposals: HashMap::new(),
            agreed_amount: None,
            target_bet,
            status: NegotiationStatus::Open,
        }
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.status == NegotiationStatus::Locked
    }

    #[must_use]
    pub fn proposal(&self, player: &PlayerId) -> Option<Chips> {
        self.proposals.get(player).copied()
    }

    fn ensure_open(&self) -> Result<(), MatchError> {
        if !self.enabled {
            return Err(MatchError::NegotiationDisabled);
        }
        if self.is_locked() {
            return Err(MatchError::NegotiationLocked);
        }
        Ok(())
    }

    /// Sets `player`'s proposal to `amount`. Raise and lower differ only in
    /// the direction the player chose; any in-range amount is accepted.
    pub fn propose(
        &mut self,
        player: &PlayerId,
        amount: Chips,
        range: &BetRange,
    ) -> Result<(), MatchError> {
        self.ensure_open()?;
        range.check(amount)?;
        self.proposals.insert(player.clone(), amount);
        Ok(())
    }

    /// Locks the negotiation at the higher of the two proposals. Returns the
    /// agreed bet.
    pub fn agree(
        &mut self,
        player: &PlayerId,
        opponent: &PlayerId,
        range: &BetRange,
    ) -> Result<Chips, MatchError> {
        self.ensure_open()?;
        let theirs = self
            .proposal(opponent)
            .ok_or(MatchError::NoOpponentProposal)?;
        let agreed = self.proposal(player).map_or(theirs, |mine| mine.max(theirs));
        range.check(agreed)?;
        self.agreed_amount = Some(agreed);
        self.status = NegotiationStatus::Locked;
        Ok(agreed)
    }

    pub fn reset(&mut self) -> Result<(), MatchError> {
        self.ensure_open()?;
        self.proposals.clear();
        Ok(())
    }

    /// Opens a fresh negotiation for the next round.
    pub fn reopen(&mut self, target_bet: Chips) {
        self.proposals.clear();
        self.agreed_amount = None;
        self.target_bet = target_bet;
        self.status = NegotiationStatus::Open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> (PlayerId, PlayerId) {
        (PlayerId::new("alice"), PlayerId::new("bob"))
    }

    fn range() -> BetRange {
        BetRange::new(10, 5_000, &[1_000, 400])
    }

    #[test]
    fn test_range_uses_smallest_bankroll() {
        let r = range();
        assert_eq!((r.min, r.max), (10, 400));
        assert!(r.contains(400));
        assert!(!r.contains(401));
        assert!(!r.contains(9));
    }

    #[test]
    fn test_proposal_moves_either_way() {
        let (alice, _) = players();
        let mut n = BetNegotiation::new(true, 25);
        n.propose(&alice, 50, &range()).unwrap();
        n.propose(&alice, 30, &range()).unwrap();
        assert_eq!(n.proposal(&alice), Some(30));
        n.propose(&alice, 30, &range()).unwrap();
        n.propose(&alice, 80, &range()).unwrap();
        assert_eq!(n.proposal(&alice), Some(80));
    }

    #[test]
    fn test_out_of_range_leaves_state_untouched() {
        let (alice, _) = players();
        let mut n = BetNegotiation::new(true, 25);
        n.propose(&alice, 50, &range()).unwrap();
        let before = n.clone();
        assert_eq!(
            n.propose(&alice, 1_000, &range()),
            Err(MatchError::BetOutOfRange {
                amount: 1_000,
                min: 10,
                max: 400
            })
        );
        assert_eq!(n, before);
    }

    #[test]
    fn test_agree_locks_at_higher_proposal() {
        let (alice, bob) = players();
        let mut n = BetNegotiation::new(true, 25);
        assert_eq!(
            n.agree(&alice, &bob, &range()),
            Err(MatchError::NoOpponentProposal)
        );
        n.propose(&alice, 40, &range()).unwrap();
        n.propose(&bob, 30, &range()).unwrap();
        assert_eq!(n.agree(&alice, &bob, &range()), Ok(40));
        assert!(n.is_locked());
        assert_eq!(n.agreed_amount, Some(40));
        assert_eq!(
            n.propose(&bob, 50, &range()),
            Err(MatchError::NegotiationLocked)
        );
    }

    #[test]
    fn test_agree_without_own_proposal_takes_opponents() {
        let (alice, bob) = players();
        let mut n = BetNegotiation::new(true, 25);
        n.propose(&bob, 30, &range()).unwrap();
        assert_eq!(n.agree(&alice, &bob, &range()), Ok(30));
    }

    #[test]
    fn test_reset_and_reopen() {
        let (alice, bob) = players();
        let mut n = BetNegotiation::new(true, 25);
        n.propose(&alice, 40, &range()).unwrap();
        n.reset().unwrap();
        assert!(n.proposals.is_empty());
        n.propose(&bob, 30, &range()).unwrap();
        n.agree(&alice, &bob, &range()).unwrap();
        n.reopen(30);
        assert_eq!(n.status, NegotiationStatus::Open);
        assert_eq!(n.target_bet, 30);
        assert!(n.agreed_amount.is_none());
    }

    #[test]
    fn test_disabled_negotiation_rejects_commands() {
        let (alice, _) = players();
        let mut n = BetNegotiation::new(false, 25);
        assert_eq!(
            n.propose(&alice, 40, &range()),
            Err(MatchError::NegotiationDisabled)
        );
    }
}
