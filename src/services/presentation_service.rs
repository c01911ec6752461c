//! Business logic behind the presentation REST routes.

use tracing::{debug, info};

use crate::{
    dao::{models::SortField, storage::bounded},
    dto::{
        pagination::{ListQuery, PageInfo},
        presentation::{CreatePresentationRequest, PresentationPage, PresentationSummary},
    },
    error::ServiceError,
    state::SharedState,
};

const SORTABLE: &[(&str, SortField)] = &[("name", SortField::Name)];

pub async fn list_presentations(
    state: &SharedState,
    query: ListQuery,
) -> Result<PresentationPage, ServiceError> {
    let page = query.to_page_request(state.config(), SORTABLE)?;
    let store = state.require_store().await?;
    let limit = state.storage_timeout();

    let presentations = bounded(limit, "list_presentations", store.list_presentations(page)).await?;
    let total = bounded(limit, "count_presentations", store.count_presentations()).await?;

    Ok(PresentationPage {
        data: presentations.into_iter().map(Into::into).collect(),
        page_info: PageInfo::new(total, page.limit),
    })
}

pub async fn get_presentation(
    state: &SharedState,
    id: i64,
) -> Result<PresentationSummary, ServiceError> {
    let store = state.require_store().await?;
    bounded(state.storage_timeout(), "find_presentation", store.find_presentation(id))
        .await?
        .map(Into::into)
        .ok_or_else(|| ServiceError::NotFound(format!("presentation {id} not found")))
}

pub async fn create_presentation(
    state: &SharedState,
    request: CreatePresentationRequest,
) -> Result<PresentationSummary, ServiceError> {
    let store = state.require_store().await?;
    let created = bounded(
        state.storage_timeout(),
        "create_presentation",
        store.create_presentation(request.name),
    )
    .await?;
    info!(presentation_id = created.id, "presentation created");
    Ok(created.into())
}

/// Delete a presentation and its sections.
///
/// A run already playing the presentation keeps its snapshot until its last viewer leaves.
pub async fn delete_presentation(state: &SharedState, id: i64) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let deleted = bounded(
        state.storage_timeout(),
        "delete_presentation",
        store.delete_presentation(id),
    )
    .await?;

    if !deleted {
        return Err(ServiceError::NotFound(format!("presentation {id} not found")));
    }
    debug!(presentation_id = id, "presentation deleted");
    Ok(())
}
