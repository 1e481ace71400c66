//! Integration tests for hosted autoplay matches.

use std::time::Duration;

use duel_blackjack::{
    MatchManager, Phase,
    session::{BotDifficulty, MatchType},
};
use duel_server::{
    autoplay,
    config::{AutoplayConfig, MatchDefaultsConfig, ServerConfig},
};
use tokio::time::timeout;

fn server_config(match_type: MatchType, fixed_bet: Option<u32>, max_rounds: u32) -> ServerConfig {
    ServerConfig {
        metrics_bind: None,
        num_matches: 1,
        match_defaults: MatchDefaultsConfig {
            match_type,
            bankroll: 1_000,
            fixed_bet,
            target_bet: 50,
            min_bet: 10,
            max_bet_cap: 5_000,
            turn_timeout_ms: 5_000,
            reconnect_grace_ms: 60_000,
            bot_difficulty: BotDifficulty::Easy,
        },
        autoplay: AutoplayConfig {
            delay_ms: 0,
            max_rounds,
            difficulty: BotDifficulty::Standard,
        },
        reap_interval_secs: 1,
        log_filter: "warn".to_string(),
    }
}

async fn wait_until_finished(manager: &MatchManager) {
    timeout(Duration::from_secs(10), async {
        loop {
            let summaries = manager.list_matches().await;
            if summaries.iter().all(|s| s.is_finished) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_bot_match_plays_to_the_round_cap() {
    let manager = MatchManager::new();
    let config = server_config(MatchType::Bot, Some(25), 3);
    let (handle, tasks) = autoplay::start_match(&manager, &config, 0).await.unwrap();
    assert_eq!(tasks.len(), 2);

    wait_until_finished(&manager).await;
    let summary = handle.summary().await.unwrap();
    assert_eq!(summary.phase, Phase::Finished);
    assert!(summary.round_number <= 3);
    assert!(summary.outcome.is_some());

    assert_eq!(manager.reap_finished().await, 1);
    assert_eq!(manager.active_match_count().await, 0);
}

#[tokio::test]
async fn test_negotiated_casual_match_deals_rounds() {
    let manager = MatchManager::new();
    let config = server_config(MatchType::Casual, None, 2);
    let (handle, tasks) = autoplay::start_match(&manager, &config, 7).await.unwrap();
    assert_eq!(tasks.len(), 3);

    wait_until_finished(&manager).await;
    let outcome = handle.summary().await.unwrap().outcome.unwrap();
    assert!(outcome.rounds_played >= 1);
    assert_eq!(outcome.final_bankrolls.len(), 2);
    assert_eq!(outcome.loser.unwrap().as_str(), "auto_7_a");
}

#[test]
fn test_setup_names_seats_per_match() {
    let config = server_config(MatchType::Ranked, Some(25), 9);
    let setup = autoplay::setup_for(&config, 4);
    assert_eq!(setup.seats[0].player.as_str(), "auto_4_a");
    assert_eq!(setup.seats[1].player.as_str(), "auto_4_b");
    assert!(setup.seats.iter().all(|s| s.ranked.is_some()));
    assert_eq!(setup.config.match_type, MatchType::Ranked);
}
