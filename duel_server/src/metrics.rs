//! Prometheus metrics for monitoring the match host.
//!
//! Metrics are exposed in Prometheus text format on the configured address.
//! Without an installed exporter every call here is a no-op.
//!
//! # Metrics
//!
//! - `active_matches`: matches currently held by the manager
//! - `rounds_resolved_total{match_type}`
//! - `pressure_raised_total{kind}`
//! - `turn_timeouts_total`
//! - `matches_ended_total{reason}`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use duel_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::active_matches(4);
//! ```

use duel_blackjack::{EndReason, MatchEvent, session::MatchType};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

/// Set current active matches count.
pub fn active_matches(count: usize) {
    metrics::gauge!("active_matches").set(count as f64);
}

pub fn rounds_resolved_total(match_type: MatchType) {
    metrics::counter!("rounds_resolved_total",
        "match_type" => match_type.to_string()
    )
    .increment(1);
}

pub fn pressure_raised_total(kind: &str) {
    metrics::counter!("pressure_raised_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn turn_timeouts_total() {
    metrics::counter!("turn_timeouts_total").increment(1);
}

pub fn matches_ended_total(reason: &EndReason) {
    metrics::counter!("matches_ended_total",
        "reason" => reason_label(reason)
    )
    .increment(1);
}

/// Label without the player id so the series stays low-cardinality.
pub fn reason_label(reason: &EndReason) -> &'static str {
    match reason {
        EndReason::Forfeit => "forfeit",
        EndReason::Abandoned => "abandoned",
        EndReason::BankrollDepleted { .. } => "bankroll_depleted",
        EndReason::SeriesDecided => "series_decided",
    }
}

/// Records every event of one accepted input. Returns `true` once the
/// match has ended.
pub fn record_events(match_type: MatchType, events: &[MatchEvent]) -> bool {
    let mut ended = false;
    for event in events {
        match event {
            MatchEvent::RoundResolved(_) => rounds_resolved_total(match_type),
            MatchEvent::PressureRaised { kind, .. } => pressure_raised_total(&kind.to_string()),
            MatchEvent::TurnTimedOut { .. } => turn_timeouts_total(),
            MatchEvent::MatchEnded(outcome) => {
                matches_ended_total(&outcome.reason);
                ended = true;
            }
            _ => {}
        }
    }
    ended
}
