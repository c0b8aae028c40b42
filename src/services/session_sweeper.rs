use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::SharedState;

/// Periodically forget idle sessions and expired vote slots.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let report = state.sweep_idle(Instant::now());
        if report.sessions > 0 || report.vote_slots > 0 {
            info!(
                sessions = report.sessions,
                vote_slots = report.vote_slots,
                remaining = state.sessions().len(),
                "swept idle sessions"
            );
        } else {
            debug!(remaining = state.sessions().len(), "nothing to sweep");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test(start_paused = true)]
    async fn sweeper_evicts_sessions_that_stop_coming_back() {
        let state = AppState::new(AppConfig {
            session_idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(60),
            ..AppConfig::default()
        });
        let (gone, _) = state.sessions().resume_or_create(None);
        let (regular, _) = state.sessions().resume_or_create(None);
        state.claim_vote_slot(&gone.to_string(), Instant::now()).unwrap();

        let sweeper = tokio::spawn(run(state.clone()));

        tokio::time::sleep(Duration::from_secs(330)).await;
        state.sessions().resume_or_create(Some(regular));
        assert_eq!(state.sessions().len(), 2);
        assert_eq!(state.vote_slots(), 0);

        tokio::time::sleep(Duration::from_secs(360)).await;
        assert!(!state.sessions().contains(gone));
        assert!(state.sessions().contains(regular));

        sweeper.abort();
    }
}
