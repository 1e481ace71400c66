//! End-to-end round flow: deal, turns, settlement, result choices.

mod common;

use common::*;
use duel_blackjack::{
    EndReason, MatchCommand, MatchError, MatchInput, NextChoice, Phase, PlayerAction,
    entities::Outcome,
    game::CardView,
    session::BotDifficulty,
};

#[test]
fn test_human_beats_bot_21_against_19() {
    let mut game = versus_bot(1_000, BotDifficulty::Standard, 25);
    game.queue_deck(deck(&[9, 10, 7, 6, 5, 3]));
    send(
        &mut game,
        ALICE,
        MatchCommand::Bet(duel_blackjack::BetCommand::Confirm),
    )
    .unwrap();

    assert_eq!(game.phase(), Phase::ActionTurn);
    assert_eq!(game.current_turn(), Some(&id(ALICE)));

    let view = game.view_for(&id(ALICE)).unwrap();
    let bot_hand = &view.opponent.hands[0];
    assert_eq!(bot_hand.cards[1], CardView::Concealed);
    assert_eq!(bot_hand.total, None);
    assert_eq!(bot_hand.visible_total, 10);
    assert_eq!(view.you.hands[0].total, Some(16));

    // 16 + 5 = 21 locks the hand, the bot then hits 16 to 19 and stands.
    let events = play(&mut game, ALICE, PlayerAction::Hit).unwrap();
    assert!(names(&events).contains(&"round:result"));
    assert_eq!(game.phase(), Phase::Result);

    let result = game.round_result().unwrap();
    let alice = result.for_player(&id(ALICE)).unwrap();
    assert_eq!(alice.outcome, Outcome::Win);
    assert_eq!(alice.net_delta, 25);
    assert_eq!(alice.hands[0].total, 21);
    let bot = result.for_player(game.bot_player().unwrap()).unwrap();
    assert_eq!(bot.hands[0].total, 19);
    assert_eq!(bot.outcome, Outcome::Lose);

    assert_eq!(game.bankroll(&id(ALICE)), Some(1_025));
    assert_eq!(game.bankroll(game.bot_player().unwrap()), Some(975));
    // The bot already picked its next step.
    assert_eq!(
        game.choice_of(game.bot_player().unwrap()),
        Some(NextChoice::Continue)
    );
}

#[test]
fn test_standing_on_16_loses_to_bot_19() {
    let mut game = versus_bot(1_000, BotDifficulty::Standard, 25);
    game.queue_deck(deck(&[9, 10, 7, 6, 3]));
    send(
        &mut game,
        ALICE,
        MatchCommand::Bet(duel_blackjack::BetCommand::Confirm),
    )
    .unwrap();

    play(&mut game, ALICE, PlayerAction::Stand).unwrap();
    let alice = game.round_result().unwrap().for_player(&id(ALICE)).unwrap().clone();
    assert_eq!(alice.outcome, Outcome::Lose);
    assert_eq!(alice.net_delta, -25);
    assert_eq!(alice.bankroll_after, 975);
}

#[test]
fn test_first_to_act_alternates_between_rounds() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[10, 9, 7, 8]));
    game.queue_deck(deck(&[10, 9, 7, 8]));

    confirm_both(&mut game);
    assert_eq!(game.current_turn(), Some(&id(ALICE)));
    stand_out(&mut game);

    // 17 against 17
    let result = game.round_result().unwrap();
    assert!(result.players.iter().all(|p| p.outcome == Outcome::Push));
    assert_eq!(game.bankroll(&id(ALICE)), Some(1_000));

    choose(&mut game, ALICE, NextChoice::Continue).unwrap();
    assert_eq!(game.phase(), Phase::Result);
    choose(&mut game, BOB, NextChoice::Continue).unwrap();

    assert_eq!(game.round_number(), 2);
    assert_eq!(game.current_turn(), Some(&id(BOB)));
    assert_eq!(game.committed_bet(), 25);
}

#[test]
fn test_natural_resolves_round_immediately() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[1, 9, 13, 9]));

    let events = confirm_both(&mut game);
    let names = names(&events);
    assert!(names.contains(&"round:dealt"));
    assert!(names.contains(&"round:result"));
    assert!(!names.contains(&"turn:started"));
    assert_eq!(game.phase(), Phase::Result);

    let hands = &game.round_result().unwrap().players[0].hands;
    assert!(hands[0].natural);
    assert_eq!(game.bankroll(&id(ALICE)), Some(1_025));
    assert_eq!(game.bankroll(&id(BOB)), Some(975));
}

#[test]
fn test_illegal_actions_are_rejected_without_change() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[9, 10, 7, 6, 2]));
    confirm_both(&mut game);
    let before = game.view_for(&id(ALICE)).unwrap();

    assert_eq!(
        play(&mut game, BOB, PlayerAction::Hit),
        Err(MatchError::NotYourTurn)
    );
    assert_eq!(
        play(&mut game, ALICE, PlayerAction::Split),
        Err(MatchError::SplitNotAllowed)
    );
    assert_eq!(
        choose(&mut game, ALICE, NextChoice::Continue),
        Err(MatchError::InvalidPhase {
            phase: Phase::ActionTurn
        })
    );
    assert_eq!(game.view_for(&id(ALICE)).unwrap(), before);

    // 16 + 2 = 18
    play(&mut game, ALICE, PlayerAction::Hit).unwrap();
    assert_eq!(
        play(&mut game, ALICE, PlayerAction::Surrender),
        Err(MatchError::SurrenderNotAllowed)
    );
    assert_eq!(
        play(&mut game, ALICE, PlayerAction::Double),
        Err(MatchError::DoubleNotAllowed)
    );
    let hand = &game.player_state(&id(ALICE)).unwrap().hands[0];
    assert_eq!(hand.action_count, 1);
    assert_eq!(hand.value().total, 18);
}

#[test]
fn test_surrender_refunds_a_quarter() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[10, 9, 6, 8]));
    confirm_both(&mut game);

    play(&mut game, ALICE, PlayerAction::Surrender).unwrap();
    assert_eq!(game.current_turn(), Some(&id(BOB)));
    play(&mut game, BOB, PlayerAction::Stand).unwrap();

    let result = game.round_result().unwrap();
    let alice = result.for_player(&id(ALICE)).unwrap();
    assert_eq!(alice.payout, 6);
    assert_eq!(alice.net_delta, -19);
    assert!(alice.hands[0].surrendered);
    assert_eq!(game.bankroll(&id(ALICE)), Some(981));
    assert_eq!(game.bankroll(&id(BOB)), Some(1_025));
}

#[test]
fn test_double_or_nothing_doubles_the_bet() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[10, 9, 7, 8]));
    game.queue_deck(deck(&[10, 9, 7, 8]));
    confirm_both(&mut game);
    stand_out(&mut game);

    let view = game.view_for(&id(ALICE)).unwrap();
    assert!(view.available_choices.contains(&NextChoice::DoubleOrNothing));

    choose(&mut game, ALICE, NextChoice::DoubleOrNothing).unwrap();
    assert_eq!(
        choose(&mut game, ALICE, NextChoice::Continue),
        Err(MatchError::AlreadyChosen)
    );
    choose(&mut game, BOB, NextChoice::DoubleOrNothing).unwrap();

    assert_eq!(game.round_number(), 2);
    assert_eq!(game.committed_bet(), 50);
    assert_eq!(game.bankroll(&id(ALICE)), Some(950));
    assert_eq!(game.player_state(&id(BOB)).unwrap().hands[0].bet, 50);
}

#[test]
fn test_mixed_choices_reopen_the_bet() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[10, 9, 7, 8]));
    confirm_both(&mut game);
    stand_out(&mut game);

    choose(&mut game, ALICE, NextChoice::Continue).unwrap();
    let events = choose(&mut game, BOB, NextChoice::Renegotiate).unwrap();
    assert!(names(&events).contains(&"phase:changed"));
    assert_eq!(game.phase(), Phase::RoundInit);
    assert!(game.player_state(&id(ALICE)).unwrap().hands.is_empty());

    let view = game.view_for(&id(BOB)).unwrap();
    assert!(view.can_confirm_bet);
    assert!(!view.you.bet_confirmed);

    game.queue_deck(deck(&[10, 9, 7, 8]));
    confirm_both(&mut game);
    assert_eq!(game.round_number(), 2);
    assert_eq!(game.phase(), Phase::ActionTurn);
}

#[test]
fn test_depleted_bankroll_ends_match() {
    let mut game = casual_fixed(25, 25);
    game.queue_deck(deck(&[10, 9, 8, 7]));
    confirm_both(&mut game);
    stand_out(&mut game);

    assert_eq!(game.phase(), Phase::Finished);
    let outcome = game.outcome().unwrap();
    assert_eq!(outcome.winner, Some(id(ALICE)));
    assert_eq!(outcome.reason, EndReason::BankrollDepleted { player: id(BOB) });
    assert_eq!(outcome.rounds_played, 1);
    assert_eq!(game.next_timer(), None);
    assert_eq!(
        confirm_or_err(&mut game),
        Err(MatchError::MatchFinished)
    );
}

fn confirm_or_err(game: &mut duel_blackjack::Match) -> Result<(), MatchError> {
    send(
        game,
        ALICE,
        MatchCommand::Bet(duel_blackjack::BetCommand::Confirm),
    )
    .map(|_| ())
}

#[test]
fn test_forfeit_mid_round_refunds_opponent() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[10, 9, 7, 8]));
    confirm_both(&mut game);

    let events = send(&mut game, ALICE, MatchCommand::Forfeit).unwrap();
    assert!(names(&events).contains(&"match:ended"));
    assert_eq!(game.bankroll(&id(BOB)), Some(1_000));
    assert_eq!(game.bankroll(&id(ALICE)), Some(975));

    let outcome = game.outcome().unwrap();
    assert_eq!(outcome.winner, Some(id(BOB)));
    assert_eq!(outcome.loser, Some(id(ALICE)));
    assert_eq!(outcome.reason, EndReason::Forfeit);

    // Everything is face up once the match is over.
    let view = game.view_for(&id(ALICE)).unwrap();
    assert!(view.opponent.hands[0].total_known);
}

#[test]
fn test_turn_timeout_auto_stands() {
    let mut game = casual_fixed(1_000, 25);
    game.queue_deck(deck(&[10, 9, 6, 8]));
    confirm_both(&mut game);

    let token = game.turn_token().unwrap();
    let events = game
        .apply(MatchInput::TurnExpired { token }, now())
        .unwrap();
    assert!(names(&events).contains(&"turn:timeout"));
    assert_eq!(game.current_turn(), Some(&id(BOB)));
    assert!(game.player_state(&id(ALICE)).unwrap().hands[0].stood);

    // The old timer firing late changes nothing.
    let events = game
        .apply(MatchInput::TurnExpired { token }, now())
        .unwrap();
    assert!(events.is_empty());
    assert_eq!(game.current_turn(), Some(&id(BOB)));
}
