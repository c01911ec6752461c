use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::{
        pagination::ListQuery,
        presentation::{CreatePresentationRequest, PresentationPage, PresentationSummary},
        section::{CreateSectionRequest, SectionPage, SectionSummary},
    },
    error::AppError,
    services::{presentation_service, section_service},
    state::SharedState,
};

/// Presentation resources and the sections nested under them.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/presentations",
            get(list_presentations).post(create_presentation),
        )
        .route(
            "/presentations/{id}",
            get(get_presentation).delete(delete_presentation),
        )
        .route(
            "/presentations/{id}/sections",
            get(list_sections).post(create_section),
        )
}

/// List presentations page by page.
#[utoipa::path(
    get,
    path = "/presentations",
    tag = "presentations",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of presentations", body = PresentationPage),
        (status = 400, description = "Invalid paging or sort parameters"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn list_presentations(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PresentationPage>, AppError> {
    Ok(Json(
        presentation_service::list_presentations(&state, query).await?,
    ))
}

/// Retrieve a presentation by its ID.
#[utoipa::path(
    get,
    path = "/presentations/{id}",
    tag = "presentations",
    params(("id" = i64, Path, description = "Presentation identifier")),
    responses(
        (status = 200, description = "Presentation found", body = PresentationSummary),
        (status = 404, description = "Presentation not found")
    )
)]
pub async fn get_presentation(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<PresentationSummary>, AppError> {
    Ok(Json(presentation_service::get_presentation(&state, id).await?))
}

/// Create a presentation.
#[utoipa::path(
    post,
    path = "/presentations",
    tag = "presentations",
    request_body = CreatePresentationRequest,
    responses(
        (status = 201, description = "Presentation created", body = PresentationSummary),
        (status = 422, description = "Invalid payload")
    )
)]
pub async fn create_presentation(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreatePresentationRequest>>,
) -> Result<(StatusCode, Json<PresentationSummary>), AppError> {
    let created = presentation_service::create_presentation(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Delete a presentation and all of its sections.
#[utoipa::path(
    delete,
    path = "/presentations/{id}",
    tag = "presentations",
    params(("id" = i64, Path, description = "Presentation identifier")),
    responses(
        (status = 204, description = "Presentation deleted"),
        (status = 404, description = "Presentation not found")
    )
)]
pub async fn delete_presentation(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    presentation_service::delete_presentation(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the sections of a presentation.
#[utoipa::path(
    get,
    path = "/presentations/{id}/sections",
    tag = "sections",
    params(("id" = i64, Path, description = "Presentation identifier"), ListQuery),
    responses(
        (status = 200, description = "One page of sections", body = SectionPage),
        (status = 400, description = "Invalid paging or sort parameters")
    )
)]
pub async fn list_sections(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> Result<Json<SectionPage>, AppError> {
    Ok(Json(section_service::list_sections(&state, id, query).await?))
}

/// Add a section to a presentation.
#[utoipa::path(
    post,
    path = "/presentations/{id}/sections",
    tag = "sections",
    params(("id" = i64, Path, description = "Presentation identifier")),
    request_body = CreateSectionRequest,
    responses(
        (status = 201, description = "Section created", body = SectionSummary),
        (status = 422, description = "Invalid payload or unknown presentation")
    )
)]
pub async fn create_section(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Valid(Json(payload)): Valid<Json<CreateSectionRequest>>,
) -> Result<(StatusCode, Json<SectionSummary>), AppError> {
    let created = section_service::create_section(&state, id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
