use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use tracing::warn;

use crate::{error::AppError, services::run_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/presentations/{id}/run",
    tag = "runs",
    params(("id" = i64, Path, description = "Presentation identifier")),
    responses(
        (status = 101, description = "Switching protocols to the run WebSocket"),
        (status = 404, description = "Presentation not found"),
        (status = 503, description = "Storage unavailable or too slow to load sections")
    )
)]
/// Attach to the presentation's run and upgrade the connection into a run WebSocket session.
pub async fn run_ws_handler(
    State(state): State<SharedState>,
    Path(presentation_id): Path<i64>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let session = run_service::attach_viewer(&state, presentation_id).await?;

    let failed_state = state.clone();
    let failed_subscriber = session.subscriber.clone();
    Ok(ws
        .on_failed_upgrade(move |err| {
            warn!(presentation_id, error = %err, "run websocket upgrade failed");
            run_service::abandon_viewer(&failed_state, presentation_id, &failed_subscriber);
        })
        .on_upgrade(move |socket| run_service::handle_socket(state, socket, session)))
}

/// Configure the run WebSocket endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/presentations/{id}/run", get(run_ws_handler))
}
