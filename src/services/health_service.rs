use tracing::warn;

use crate::{
    dao::storage::bounded,
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Respond with the service health while logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.require_store().await {
        Ok(store) => {
            if let Err(err) =
                bounded(state.storage_timeout(), "health_check", store.health_check()).await
            {
                warn!(error = %err, "storage health check failed");
            }
        }
        Err(_) => warn!("storage unavailable (degraded mode)"),
    }

    let status = if state.is_degraded() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };
    HealthResponse {
        status,
        live_runs: state.runs().len(),
    }
}
