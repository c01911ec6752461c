use serde::Serialize;
use utoipa::ToSchema;

/// Storage-backed availability of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage is reachable.
    Ok,
    /// Storage is unavailable; REST calls and new runs are refused.
    Degraded,
}

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Presentations currently being played by at least one viewer.
    pub live_runs: usize,
}
