use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::section::{MoveSectionRequest, PatchSectionRequest, SectionSummary, UpdateSectionRequest},
    error::AppError,
    services::section_service,
    state::SharedState,
};

/// Section resources addressed by their own identifier.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/sections/{id}",
            get(get_section)
                .put(replace_section)
                .patch(patch_section)
                .delete(delete_section),
        )
        .route("/sections/{id}/move", post(move_section))
}

/// Retrieve a section by its ID.
#[utoipa::path(
    get,
    path = "/sections/{id}",
    tag = "sections",
    params(("id" = i64, Path, description = "Section identifier")),
    responses(
        (status = 200, description = "Section found", body = SectionSummary),
        (status = 404, description = "Section not found")
    )
)]
pub async fn get_section(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<SectionSummary>, AppError> {
    Ok(Json(section_service::get_section(&state, id).await?))
}

/// Replace every editable field of a section.
#[utoipa::path(
    put,
    path = "/sections/{id}",
    tag = "sections",
    params(("id" = i64, Path, description = "Section identifier")),
    request_body = UpdateSectionRequest,
    responses(
        (status = 204, description = "Section updated"),
        (status = 404, description = "Section not found"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn replace_section(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Valid(Json(payload)): Valid<Json<UpdateSectionRequest>>,
) -> Result<StatusCode, AppError> {
    section_service::replace_section(&state, id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Update a subset of a section's fields.
#[utoipa::path(
    patch,
    path = "/sections/{id}",
    tag = "sections",
    params(("id" = i64, Path, description = "Section identifier")),
    request_body = PatchSectionRequest,
    responses(
        (status = 204, description = "Section updated"),
        (status = 404, description = "Section not found"),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn patch_section(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Valid(Json(payload)): Valid<Json<PatchSectionRequest>>,
) -> Result<StatusCode, AppError> {
    section_service::patch_section(&state, id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a section.
#[utoipa::path(
    delete,
    path = "/sections/{id}",
    tag = "sections",
    params(("id" = i64, Path, description = "Section identifier")),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Section not found")
    )
)]
pub async fn delete_section(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    section_service::delete_section(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Shift a section by a relative number of places within its presentation.
#[utoipa::path(
    post,
    path = "/sections/{id}/move",
    tag = "sections",
    params(("id" = i64, Path, description = "Section identifier")),
    request_body = MoveSectionRequest,
    responses(
        (status = 200, description = "Sections in their new order", body = [SectionSummary]),
        (status = 404, description = "Section not found")
    )
)]
pub async fn move_section(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(payload): Json<MoveSectionRequest>,
) -> Result<Json<Vec<SectionSummary>>, AppError> {
    Ok(Json(section_service::move_section(&state, id, payload).await?))
}
