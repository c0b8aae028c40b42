use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report health, pinging the account store when one is installed.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_account_store().await {
        Ok(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "account store health check failed");
            }
        }
        Err(_) => warn!("account store unavailable (degraded mode)"),
    }

    let sessions = state.sessions().len();
    if state.is_degraded().await {
        HealthResponse::degraded(sessions)
    } else {
        HealthResponse::ok(sessions)
    }
}
