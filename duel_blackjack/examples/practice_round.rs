//! Practice Round Example
//!
//! Plays a few rounds against the engine-played bot, printing what the
//! human seat is allowed to see along the way.

use chrono::Utc;
use duel_blackjack::{
    BetCommand, Match, MatchCommand, MatchConfig, MatchInput, MatchSetup, NextChoice, Phase,
    PlayerAction, PlayerId,
    game::{CardView, HandView},
    session::{BetConfig, BotDifficulty},
};

fn describe(hand: &HandView) -> String {
    let cards: Vec<String> = hand
        .cards
        .iter()
        .map(|card| match card {
            CardView::Shown { value, suit } => format!("{value}{suit:?}"),
            CardView::Concealed => "??".to_string(),
        })
        .collect();
    match hand.total {
        Some(total) => format!("[{}] = {total}", cards.join(" ")),
        None => format!("[{}] showing {}", cards.join(" "), hand.visible_total),
    }
}

fn send(game: &mut Match, command: MatchCommand) {
    if let Err(e) = game.apply(MatchInput::command("alice", command), Utc::now()) {
        println!("  rejected: {e}");
    }
}

fn main() {
    println!("=== Duel Blackjack: practice against a bot ===\n");

    let config = MatchConfig {
        bet: BetConfig::Fixed(25),
        seed: Some(42),
        ..MatchConfig::default()
    };
    let setup = MatchSetup::versus_bot("alice", 500, BotDifficulty::Standard, config);
    let mut game = match Match::new(setup) {
        Ok(game) => game,
        Err(e) => {
            eprintln!("Could not set up the match: {e}");
            return;
        }
    };
    let alice = PlayerId::new("alice");

    send(&mut game, MatchCommand::Bet(BetCommand::Confirm));

    for _ in 0..3 {
        println!("Round {}", game.round_number());
        while game.phase() == Phase::ActionTurn {
            let Some(view) = game.view_for(&alice) else {
                break;
            };
            let Some(hand) = view.you.hands.iter().find(|h| !h.stood && !h.locked) else {
                break;
            };
            println!("  you: {}", describe(hand));
            println!("  bot: {}", describe(&view.opponent.hands[0]));

            let action = match hand.total {
                Some(total) if total < 17 => PlayerAction::Hit,
                _ => PlayerAction::Stand,
            };
            println!("  -> {action}");
            send(&mut game, MatchCommand::Play(action));
        }

        if let Some(result) = game.round_result() {
            for player in &result.players {
                let totals: Vec<u32> = player.hands.iter().map(|h| h.total).collect();
                println!(
                    "  {} {:?} with {:?}, net {:+}, bankroll {}",
                    player.player, player.outcome, totals, player.net_delta, player.bankroll_after
                );
            }
        }

        if game.is_finished() {
            break;
        }
        send(&mut game, MatchCommand::ChooseNext(NextChoice::Continue));
        println!();
    }

    if let Some(outcome) = game.outcome() {
        println!("Match over: {:?}", outcome.reason);
    }
}
