//! Structured logging configuration.
//!
//! The library logs through the `log` facade; `tracing-subscriber` picks
//! those records up next to the server's own `tracing` spans.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels come from `RUST_LOG`, falling back to `default_filter`.
///
/// # Example
///
/// ```no_run
/// use duel_server::logging;
///
/// logging::init("info");
/// tracing::info!("Server starting");
/// ```
pub fn init(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log the end of a match with its outcome
pub fn log_match_ended(match_id: &str, reason: &str, winner: Option<&str>, rounds: u32) {
    tracing::info!(
        match_id = match_id,
        reason = reason,
        winner = winner,
        rounds = rounds,
        "Match ended"
    );
}

/// Log an autoplay command the engine turned down
pub fn log_rejected_command(match_id: &str, player: &str, command: &str, error: &str) {
    tracing::debug!(
        match_id = match_id,
        player = player,
        command = command,
        error = error,
        "Command rejected"
    );
}
