use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report storage reachability together with the number of live connections.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let storage_ok = match state.match_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        None => {
            warn!("storage unavailable (degraded mode)");
            false
        }
    };

    HealthResponse::new(storage_ok, state.liveness().connection_count())
}
