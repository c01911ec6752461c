//! DTO definitions for the presentation REST resources.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::PresentationEntity,
    dto::{pagination::PageInfo, validation::validate_display_name},
};

/// Payload used to create a presentation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreatePresentationRequest {
    /// Between 5 and 50 characters.
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
}

/// Presentation as exposed over REST.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PresentationSummary {
    pub id: i64,
    pub name: String,
}

impl From<PresentationEntity> for PresentationSummary {
    fn from(value: PresentationEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

/// One page of presentations.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PresentationPage {
    pub data: Vec<PresentationSummary>,
    pub page_info: PageInfo,
}
