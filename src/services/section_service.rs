//! Business logic behind the section REST routes.

use std::time::Duration;

use tracing::{debug, info};

use crate::{
    dao::{
        models::{NewSection, SortField},
        storage::bounded,
    },
    dto::{
        pagination::{ListQuery, PageInfo},
        section::{
            CreateSectionRequest, MoveSectionRequest, PatchSectionRequest, SectionPage,
            SectionSummary, UpdateSectionRequest,
        },
    },
    error::ServiceError,
    state::SharedState,
};

const SORTABLE: &[(&str, SortField)] = &[
    ("name", SortField::Name),
    ("duration", SortField::Duration),
    ("position", SortField::Position),
];

fn section_not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("section {id} not found"))
}

pub async fn list_sections(
    state: &SharedState,
    presentation_id: i64,
    query: ListQuery,
) -> Result<SectionPage, ServiceError> {
    let page = query.to_page_request(state.config(), SORTABLE)?;
    let store = state.require_store().await?;
    let limit = state.storage_timeout();

    let sections = bounded(
        limit,
        "list_sections",
        store.list_sections(presentation_id, page),
    )
    .await?;
    let total = bounded(limit, "count_sections", store.count_sections(presentation_id)).await?;

    Ok(SectionPage {
        data: sections.into_iter().map(Into::into).collect(),
        page_info: PageInfo::new(total, page.limit),
    })
}

pub async fn get_section(state: &SharedState, id: i64) -> Result<SectionSummary, ServiceError> {
    let store = state.require_store().await?;
    bounded(state.storage_timeout(), "find_section", store.find_section(id))
        .await?
        .map(Into::into)
        .ok_or_else(|| section_not_found(id))
}

/// Add a section to an existing presentation.
///
/// A missing presentation is a validation failure of the payload rather than a missing resource.
pub async fn create_section(
    state: &SharedState,
    presentation_id: i64,
    request: CreateSectionRequest,
) -> Result<SectionSummary, ServiceError> {
    let store = state.require_store().await?;
    let limit = state.storage_timeout();

    if bounded(limit, "find_presentation", store.find_presentation(presentation_id))
        .await?
        .is_none()
    {
        return Err(ServiceError::Validation(format!(
            "presentation {presentation_id} does not exist"
        )));
    }

    let created = bounded(
        limit,
        "create_section",
        store.create_section(NewSection {
            presentation: presentation_id,
            name: request.name,
            duration: Duration::from_millis(request.duration_ms),
            position: request.position,
        }),
    )
    .await?;
    info!(
        presentation_id,
        section_id = created.id,
        position = created.position,
        "section created"
    );
    Ok(created.into())
}

pub async fn replace_section(
    state: &SharedState,
    id: i64,
    request: UpdateSectionRequest,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    bounded(
        state.storage_timeout(),
        "update_section",
        store.update_section(id, request.into()),
    )
    .await?
    .map(|_| ())
    .ok_or_else(|| section_not_found(id))
}

pub async fn patch_section(
    state: &SharedState,
    id: i64,
    request: PatchSectionRequest,
) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    bounded(
        state.storage_timeout(),
        "update_section",
        store.update_section(id, request.into()),
    )
    .await?
    .map(|_| ())
    .ok_or_else(|| section_not_found(id))
}

pub async fn delete_section(state: &SharedState, id: i64) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let deleted = bounded(state.storage_timeout(), "delete_section", store.delete_section(id)).await?;
    if !deleted {
        return Err(section_not_found(id));
    }
    debug!(section_id = id, "section deleted");
    Ok(())
}

/// Move a section by a relative offset, returning its presentation's sections in their new order.
pub async fn move_section(
    state: &SharedState,
    id: i64,
    request: MoveSectionRequest,
) -> Result<Vec<SectionSummary>, ServiceError> {
    let store = state.require_store().await?;
    let reordered = bounded(
        state.storage_timeout(),
        "move_section",
        store.move_section(id, request.delta),
    )
    .await?
    .ok_or_else(|| section_not_found(id))?;

    debug!(section_id = id, delta = request.delta, "section moved");
    Ok(reordered.into_iter().map(Into::into).collect())
}
