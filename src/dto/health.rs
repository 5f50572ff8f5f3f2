use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Identified real-time connections currently open.
    pub connections: usize,
}

impl HealthResponse {
    /// Build the payload from storage reachability.
    pub fn new(storage_ok: bool, connections: usize) -> Self {
        let status = if storage_ok { "ok" } else { "degraded" };
        Self {
            status: status.to_string(),
            connections,
        }
    }
}
