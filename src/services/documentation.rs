use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the presentation timer.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::presentations::list_presentations,
        crate::routes::presentations::get_presentation,
        crate::routes::presentations::create_presentation,
        crate::routes::presentations::delete_presentation,
        crate::routes::presentations::list_sections,
        crate::routes::presentations::create_section,
        crate::routes::sections::get_section,
        crate::routes::sections::replace_section,
        crate::routes::sections::patch_section,
        crate::routes::sections::delete_section,
        crate::routes::sections::move_section,
        crate::routes::runs::run_ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::pagination::PageInfo,
            crate::dto::presentation::CreatePresentationRequest,
            crate::dto::presentation::PresentationSummary,
            crate::dto::presentation::PresentationPage,
            crate::dto::section::CreateSectionRequest,
            crate::dto::section::UpdateSectionRequest,
            crate::dto::section::PatchSectionRequest,
            crate::dto::section::MoveSectionRequest,
            crate::dto::section::SectionSummary,
            crate::dto::section::SectionPage,
            crate::dto::run::RunInboundMessage,
            crate::dto::run::RunSnapshot,
            crate::dto::run::RunningState,
            crate::dto::run::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "presentations", description = "Presentation management"),
        (name = "sections", description = "Timed sections of a presentation"),
        (name = "runs", description = "WebSocket rehearsal runs"),
    )
)]
pub struct ApiDoc;
