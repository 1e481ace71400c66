/// Property-based tests for hand evaluation and settlement using proptest
///
/// These tests verify that totals, soft/bust/natural flags and head-to-head
/// settlement hold across randomly generated hands.
use duel_blackjack::game::{
    entities::{Card, Hand, Outcome, Suit},
    functional::{ReferenceHand, evaluate, settle_hand, surrender_refund},
};
use proptest::prelude::*;

// Strategy to generate a card (values 1-13, aces are value 1)
fn card_strategy() -> impl Strategy<Value = Card> {
    (1u8..=13, 0usize..4).prop_map(|(value, suit_idx)| Card(value, Suit::ALL[suit_idx]))
}

fn cards_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card_strategy(), min..=max)
}

fn hand_of(cards: &[Card], bet: u32) -> Hand {
    let mut hand = Hand::new(bet);
    for &card in cards {
        hand.push_card(card);
    }
    hand
}

// Aces counted as 1
fn hard_total(cards: &[Card]) -> u32 {
    cards
        .iter()
        .map(|c| if c.is_ace() { 1 } else { c.points() })
        .sum()
}

proptest! {
    #[test]
    fn test_bust_iff_over_21(cards in cards_strategy(1, 8)) {
        let value = evaluate(&cards);
        prop_assert_eq!(value.is_bust, value.total > 21);
    }

    #[test]
    fn test_total_is_hard_total_or_one_soft_ace(cards in cards_strategy(1, 8)) {
        let value = evaluate(&cards);
        let hard = hard_total(&cards);
        if value.is_soft {
            prop_assert_eq!(value.total, hard + 10);
            prop_assert!(value.total <= 21, "a soft hand never busts");
            prop_assert!(cards.iter().any(Card::is_ace));
        } else {
            prop_assert_eq!(value.total, hard);
        }
    }

    #[test]
    fn test_natural_iff_two_cards_totalling_21(cards in cards_strategy(1, 5)) {
        let value = evaluate(&cards);
        prop_assert_eq!(value.is_natural, cards.len() == 2 && value.total == 21);
    }

    #[test]
    fn test_evaluation_is_deterministic(cards in cards_strategy(1, 8)) {
        prop_assert_eq!(evaluate(&cards), evaluate(&cards));
    }

    #[test]
    fn test_head_to_head_outcomes_mirror(
        a in cards_strategy(2, 6),
        b in cards_strategy(2, 6),
        bet in 1u32..500,
    ) {
        let hand_a = hand_of(&a, bet);
        let hand_b = hand_of(&b, bet);
        let (out_a, pay_a) = settle_hand(&hand_a, &ReferenceHand::Standing(hand_b.value()));
        let (out_b, pay_b) = settle_hand(&hand_b, &ReferenceHand::Standing(hand_a.value()));

        if hand_a.bust && hand_b.bust {
            prop_assert_eq!((out_a, out_b), (Outcome::Lose, Outcome::Lose));
        } else {
            let mirrored = matches!(
                (out_a, out_b),
                (Outcome::Win, Outcome::Lose) | (Outcome::Lose, Outcome::Win) | (Outcome::Push, Outcome::Push)
            );
            prop_assert!(mirrored, "{:?} vs {:?}", out_a, out_b);
            // Chips only move between the two players
            prop_assert_eq!(pay_a + pay_b, bet * 2);
        }
    }

    #[test]
    fn test_payout_matches_outcome(cards in cards_strategy(2, 6), bet in 1u32..500) {
        let hand = hand_of(&cards, bet);
        let reference = ReferenceHand::Standing(evaluate(&[Card(10, Suit::Club), Card(8, Suit::Club)]));
        let (outcome, payout) = settle_hand(&hand, &reference);
        let expected = match outcome {
            Outcome::Win => bet * 2,
            Outcome::Push => bet,
            Outcome::Lose => 0,
        };
        prop_assert_eq!(payout, expected);
    }

    #[test]
    fn test_surrender_refund_is_floored_quarter(bet in 0u32..100_000) {
        let refund = surrender_refund(bet);
        prop_assert_eq!(refund, bet / 4);
        prop_assert!(refund <= bet);
    }
}

#[test]
fn test_known_totals() {
    let ace = Card(1, Suit::Spade);
    let king = Card(13, Suit::Heart);
    let six = Card(6, Suit::Club);

    let blackjack = evaluate(&[ace, king]);
    assert_eq!(blackjack.total, 21);
    assert!(blackjack.is_natural);
    assert!(blackjack.is_soft);

    let soft_17 = evaluate(&[ace, six]);
    assert_eq!(soft_17.total, 17);
    assert!(soft_17.is_soft);

    let hard_17 = evaluate(&[ace, six, king]);
    assert_eq!(hard_17.total, 17);
    assert!(!hard_17.is_soft);
    assert!(!hard_17.is_natural);

    let two_aces = evaluate(&[ace, Card(1, Suit::Heart)]);
    assert_eq!(two_aces.total, 12);
    assert!(two_aces.is_soft);
}

#[test]
fn test_surrendered_hand_loses_with_refund() {
    let mut hand = hand_of(&[Card(10, Suit::Spade), Card(6, Suit::Spade)], 25);
    hand.surrendered = true;
    let (outcome, payout) = settle_hand(&hand, &ReferenceHand::Forfeited);
    assert_eq!(outcome, Outcome::Lose);
    assert_eq!(payout, 6);
}
