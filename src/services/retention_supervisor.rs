use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::state::SharedState;

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Periodically drop idle players and closed rate-limit windows.
pub async fn run(state: SharedState, period: Duration) {
    let period = if period < MIN_PERIOD {
        warn!(?period, min = ?MIN_PERIOD, "sweep period too short; clamping");
        MIN_PERIOD
    } else {
        period
    };
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(?period, "retention sweeper started");

    loop {
        ticker.tick().await;
        sweep_once(&state, Instant::now()).await;
    }
}

/// One sweep pass. Returns `(players purged, windows dropped)`.
pub async fn sweep_once(state: &SharedState, now: Instant) -> (usize, usize) {
    let players = state.write_quiz(|quiz| quiz.purge_idle_players(now)).await;
    let windows = state.gate().sweep(now);
    if players > 0 || windows > 0 {
        info!(players, windows, "retention sweep removed stale entries");
    } else {
        debug!("retention sweep found nothing to remove");
    }
    (players, windows)
}
