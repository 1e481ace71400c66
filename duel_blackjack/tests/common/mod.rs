//! Shared helpers for match integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use duel_blackjack::{
    BetCommand, Card, Deck, Match, MatchCommand, MatchConfig, MatchError, MatchEvent, MatchInput,
    MatchSetup, NextChoice, Phase, PlayerAction, PlayerId, Suit,
    session::{BetConfig, BotDifficulty},
};

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";

/// Deck dealing `values` in order. Suits rotate with the position so
/// repeated values stay distinct cards.
pub fn deck(values: &[u8]) -> Deck {
    let mut cards: Vec<Card> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| Card(v, Suit::ALL[i % 4]))
        .collect();
    // Filler so a test never runs dry.
    cards.extend((2u8..=5).flat_map(|v| Suit::ALL.map(|s| Card(v, s))));
    Deck::stacked(cards)
}

pub fn fixed_config(bet: u32) -> MatchConfig {
    MatchConfig {
        bet: BetConfig::Fixed(bet),
        seed: Some(7),
        ..MatchConfig::default()
    }
}

pub fn casual_fixed(bankroll: u32, bet: u32) -> Match {
    Match::new(MatchSetup::casual(ALICE, BOB, bankroll, fixed_config(bet))).unwrap()
}

pub fn casual_negotiated(bankroll: u32) -> Match {
    let config = MatchConfig {
        seed: Some(7),
        ..MatchConfig::default()
    };
    Match::new(MatchSetup::casual(ALICE, BOB, bankroll, config)).unwrap()
}

pub fn versus_bot(bankroll: u32, difficulty: BotDifficulty, bet: u32) -> Match {
    Match::new(MatchSetup::versus_bot(
        ALICE,
        bankroll,
        difficulty,
        fixed_config(bet),
    ))
    .unwrap()
}

pub fn id(name: &str) -> PlayerId {
    PlayerId::new(name)
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn send(game: &mut Match, player: &str, command: MatchCommand) -> Result<Vec<MatchEvent>, MatchError> {
    game.apply(MatchInput::command(player, command), now())
}

pub fn play(game: &mut Match, player: &str, action: PlayerAction) -> Result<Vec<MatchEvent>, MatchError> {
    send(game, player, MatchCommand::Play(action))
}

pub fn confirm_both(game: &mut Match) -> Vec<MatchEvent> {
    let mut events = send(game, ALICE, MatchCommand::Bet(BetCommand::Confirm)).unwrap();
    events.extend(send(game, BOB, MatchCommand::Bet(BetCommand::Confirm)).unwrap());
    events
}

pub fn choose(game: &mut Match, player: &str, choice: NextChoice) -> Result<Vec<MatchEvent>, MatchError> {
    send(game, player, MatchCommand::ChooseNext(choice))
}

/// Whoever holds the turn stands until the round is over.
pub fn stand_out(game: &mut Match) {
    while game.phase() == Phase::ActionTurn {
        let player = game.current_turn().unwrap().clone();
        play(game, player.as_str(), PlayerAction::Stand).unwrap();
    }
}

pub fn names(events: &[MatchEvent]) -> Vec<&'static str> {
    events.iter().map(MatchEvent::name).collect()
}
