//! Relay health computed from both document stores.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report `ok` when both documents can be read, `degraded` otherwise.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let mut degraded = false;
    for store in [state.rankings(), state.admin_settings()] {
        if let Err(err) = store.load().await {
            warn!(store = %store.describe(), error = %err, "document store health check failed");
            degraded = true;
        }
    }

    if degraded {
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
