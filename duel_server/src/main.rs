//! Duel blackjack match host using the async actor model.
//!
//! This server spawns one MatchActor per match through MatchManager and
//! seats autoplay clients in every human seat.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use ctrlc::set_handler;
use duel_blackjack::{MatchManager, series::InMemoryRatingStore, session::MatchType};
use duel_server::{autoplay, config::ServerConfig, logging, metrics};
use log::{error, info};
use pico_args::Arguments;
use tokio::sync::watch;

const HELP: &str = "\
Host autoplayed duel blackjack matches

USAGE:
  duel_server [OPTIONS]

OPTIONS:
  --metrics    IP:PORT     Prometheus listener          [default: env METRICS_BIND, off when unset]
  --matches    N           Number of matches to host    [default: env MAX_MATCHES or 1]
  --type       TYPE        casual, ranked, practice, bot [default: env MATCH_TYPE or bot]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  MATCH_BANKROLL           Starting bankroll of every seat
  MATCH_FIXED_BET          Fixed stake, or 'negotiated'
  TURN_TIMEOUT_MS          Deadline of each turn
  AUTOPLAY_DELAY_MS        Pause before each autoplay command
  AUTOPLAY_MAX_ROUNDS      Rounds before an undecided match is forfeited
  (See .env file for all configuration options)
";

struct Args {
    metrics: Option<SocketAddr>,
    matches: Option<usize>,
    match_type: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        metrics: pargs.opt_value_from_str("--metrics")?,
        matches: pargs.opt_value_from_str("--matches")?,
        match_type: pargs.opt_value_from_str("--type")?,
    };

    let config = ServerConfig::from_env(args.metrics, args.matches, args.match_type)?;
    config.validate()?;

    logging::init(&config.log_filter);

    // Catching signals for exit.
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    set_handler(move || {
        let _ = shutdown_tx.send(true);
    })?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Metrics exported at http://{addr}/metrics");
    }

    let manager = match config.match_defaults.match_type {
        MatchType::Ranked => MatchManager::with_rating_store(Arc::new(InMemoryRatingStore::new())),
        _ => MatchManager::new(),
    };

    info!("Creating {} {} match(es)...", config.num_matches, config.match_defaults.match_type);
    let mut tasks = Vec::new();
    for index in 0..config.num_matches {
        match autoplay::start_match(&manager, &config, index).await {
            Ok((handle, spawned)) => {
                info!("✓ Started match {} with ID {}", index + 1, handle.match_id());
                tasks.extend(spawned);
            }
            Err(e) => error!("Failed to start match {}: {}", index + 1, e),
        }
    }
    metrics::active_matches(manager.active_match_count().await);

    for summary in manager.list_matches().await {
        let players: Vec<String> = summary
            .players
            .iter()
            .map(|(player, bankroll)| format!("{player} ({bankroll})"))
            .collect();
        info!("  - {} {}: {}", summary.match_type, summary.match_id, players.join(" vs "));
    }

    info!("Host is running. Press Ctrl+C to stop.");
    let mut reap = tokio::time::interval(Duration::from_secs(config.reap_interval_secs));
    loop {
        tokio::select! {
            _ = reap.tick() => {
                let reaped = manager.reap_finished().await;
                let active = manager.active_match_count().await;
                metrics::active_matches(active);
                if reaped > 0 {
                    info!("Reaped {reaped} finished match(es), {active} still running");
                }
                if active == 0 {
                    info!("Every match has finished");
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    info!("Shutting down host...");
    for summary in manager.list_matches().await {
        if let Err(e) = manager.close_match(summary.match_id).await {
            error!("Failed to close match {}: {}", summary.match_id, e);
        }
    }
    for task in tasks {
        task.abort();
    }
    metrics::active_matches(0);

    Ok(())
}
