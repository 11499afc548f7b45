use tracing::{debug, warn};

use crate::{dto::health::HealthResponse, state::SharedState};

/// Health-check the installed snapshot store.
///
/// Gameplay keeps working while degraded; only snapshots are lost.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let Some(store) = state.snapshot_store().await else {
        debug!("no snapshot store installed yet");
        return HealthResponse::degraded();
    };
    if let Err(err) = store.health_check().await {
        warn!(error = %err, "snapshot store health check failed");
        return HealthResponse::degraded();
    }

    HealthResponse::from_degraded(state.is_degraded().await)
}
