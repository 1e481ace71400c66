//! Pressure betting after splits and doubles.

mod common;

use common::*;
use duel_blackjack::{
    Match, MatchCommand, MatchError, MatchInput, MatchSetup, Phase, PlayerAction,
    PressureDecision,
    game::{MatchEvent, PressureKind},
    session::BotDifficulty,
};

fn respond(game: &mut Match, player: &str, decision: PressureDecision) -> Result<Vec<MatchEvent>, MatchError> {
    send(game, player, MatchCommand::RespondToPressure(decision))
}

/// Alice is dealt a pair of eights, Bob 17.
fn split_eights(game: &mut Match) {
    game.queue_deck(deck(&[8, 10, 8, 7, 3, 2]));
    confirm_both(game);
    let events = play(game, ALICE, PlayerAction::Split).unwrap();
    assert!(names(&events).contains(&"pressure:raised"));
}

#[test]
fn test_split_blocks_everyone_but_the_opponent() {
    let mut game = casual_fixed(1_000, 25);
    split_eights(&mut game);

    assert_eq!(game.phase(), Phase::PressureResponse);
    let pressure = game.pending_pressure().unwrap();
    assert_eq!(pressure.initiator, id(ALICE));
    assert_eq!(pressure.opponent, id(BOB));
    assert_eq!(pressure.kind, PressureKind::Split);
    assert_eq!(pressure.delta, 25);
    assert_eq!(pressure.affected_hand_indices, vec![0]);

    let alice = game.player_state(&id(ALICE)).unwrap();
    assert_eq!(alice.hands.len(), 2);
    assert_eq!(alice.hands[0].value().total, 11);
    assert_eq!(alice.hands[1].value().total, 10);
    assert_eq!(alice.bankroll, 950);

    assert_eq!(
        play(&mut game, ALICE, PlayerAction::Stand),
        Err(MatchError::PressurePending)
    );
    assert_eq!(
        play(&mut game, BOB, PlayerAction::Stand),
        Err(MatchError::PressurePending)
    );
    assert_eq!(
        send(&mut game, BOB, MatchCommand::Forfeit),
        Err(MatchError::PressurePending)
    );
    assert_eq!(
        respond(&mut game, ALICE, PressureDecision::Match),
        Err(MatchError::NotPressureTarget)
    );

    let alice_view = game.view_for(&id(ALICE)).unwrap();
    let bob_view = game.view_for(&id(BOB)).unwrap();
    assert!(!alice_view.pressure.unwrap().awaiting_you);
    assert!(bob_view.pressure.unwrap().awaiting_you);
}

#[test]
fn test_matched_pressure_raises_the_stake() {
    let mut game = casual_fixed(1_000, 25);
    split_eights(&mut game);

    respond(&mut game, BOB, PressureDecision::Match).unwrap();
    assert_eq!(game.phase(), Phase::ActionTurn);
    assert_eq!(game.current_turn(), Some(&id(ALICE)));
    let bob = game.player_state(&id(BOB)).unwrap();
    assert_eq!(bob.hands[0].bet, 50);
    assert_eq!(bob.bankroll, 950);

    stand_out(&mut game);

    // 11 and 10 against 17
    let result = game.round_result().unwrap();
    assert_eq!(result.for_player(&id(ALICE)).unwrap().net_delta, -50);
    assert_eq!(result.for_player(&id(BOB)).unwrap().net_delta, 50);
    assert_eq!(game.bankroll(&id(ALICE)), Some(950));
    assert_eq!(game.bankroll(&id(BOB)), Some(1_050));
}

#[test]
fn test_surrendered_pressure_forfeits_the_hand() {
    let mut game = casual_fixed(1_000, 25);
    split_eights(&mut game);

    let events = respond(&mut game, BOB, PressureDecision::Surrender).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        MatchEvent::PressureResolved {
            decision: PressureDecision::Surrender,
            auto: false,
            ..
        }
    )));
    assert!(game.player_state(&id(BOB)).unwrap().hands[0].surrendered);

    stand_out(&mut game);
    assert_eq!(game.phase(), Phase::Result);
    assert_eq!(game.bankroll(&id(ALICE)), Some(1_050));
    assert_eq!(game.bankroll(&id(BOB)), Some(981));
}

#[test]
fn test_double_raises_pressure() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[5, 10, 6, 7, 10]));
    confirm_both(&mut game);

    play(&mut game, ALICE, PlayerAction::Double).unwrap();
    let alice = game.player_state(&id(ALICE)).unwrap();
    assert!(alice.hands[0].doubled);
    assert!(alice.hands[0].locked);
    assert_eq!(alice.hands[0].bet, 50);
    assert_eq!(alice.hands[0].value().total, 21);
    assert_eq!(game.pending_pressure().unwrap().kind, PressureKind::Double);

    respond(&mut game, BOB, PressureDecision::Match).unwrap();
    assert_eq!(game.current_turn(), Some(&id(BOB)));
    play(&mut game, BOB, PlayerAction::Stand).unwrap();

    assert_eq!(game.bankroll(&id(ALICE)), Some(1_050));
    assert_eq!(game.bankroll(&id(BOB)), Some(950));
}

#[test]
fn test_pressure_timeout_matches_when_affordable() {
    let mut game = casual_fixed(1_000, 25);
    split_eights(&mut game);

    let token = game.turn_token().unwrap();
    let events = game.apply(MatchInput::TurnExpired { token }, now()).unwrap();
    assert!(events.iter().any(|e| matches!(
        e,
        MatchEvent::PressureResolved {
            decision: PressureDecision::Match,
            auto: true,
            ..
        }
    )));
    assert_eq!(game.player_state(&id(BOB)).unwrap().hands[0].bet, 50);
}

#[test]
fn test_pressure_timeout_surrenders_when_broke() {
    let mut setup = MatchSetup::casual(ALICE, BOB, 1_000, fixed_config(25));
    setup.seats[1].bankroll = 30;
    let mut game = Match::new(setup).unwrap();
    split_eights(&mut game);

    assert!(matches!(
        respond(&mut game, BOB, PressureDecision::Match),
        Err(MatchError::InsufficientBankroll {
            required: 25,
            available: 5
        })
    ));
    // Still waiting on Bob after the rejected answer.
    assert!(game.pending_pressure().is_some());

    let token = game.turn_token().unwrap();
    game.apply(MatchInput::TurnExpired { token }, now()).unwrap();
    assert!(game.pending_pressure().is_none());
    assert!(game.player_state(&id(BOB)).unwrap().hands[0].surrendered);
    assert_eq!(game.current_turn(), Some(&id(ALICE)));
}

#[test]
fn test_no_pressure_against_a_bot() {
    let mut game = versus_bot(1_000, BotDifficulty::Standard, 25);
    game.queue_deck(deck(&[8, 10, 8, 7, 3, 2]));
    send(
        &mut game,
        ALICE,
        MatchCommand::Bet(duel_blackjack::BetCommand::Confirm),
    )
    .unwrap();

    play(&mut game, ALICE, PlayerAction::Split).unwrap();
    assert!(game.pending_pressure().is_none());
    assert_eq!(game.phase(), Phase::ActionTurn);
    assert_eq!(game.current_turn(), Some(&id(ALICE)));
    assert_eq!(
        respond(&mut game, ALICE, PressureDecision::Match),
        Err(MatchError::NoPendingPressure)
    );
}
