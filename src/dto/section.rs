//! DTO definitions for the section REST resources.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{SectionEntity, SectionPatch},
    dto::{
        pagination::PageInfo,
        validation::{SECTION_MIN_DURATION_MS, validate_display_name},
    },
    state::section::Section,
};

/// Payload used to add a section to a presentation.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSectionRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
    /// Allotted time in milliseconds, at least one second.
    #[validate(range(min = SECTION_MIN_DURATION_MS))]
    pub duration_ms: u64,
    /// Explicit position; appended after the last section when omitted.
    #[serde(default)]
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

/// Full replacement of a section's editable fields.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateSectionRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
    #[validate(range(min = SECTION_MIN_DURATION_MS))]
    pub duration_ms: u64,
    #[validate(range(min = 0))]
    pub position: i32,
}

/// Partial update of a section; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct PatchSectionRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_display_name"))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(range(min = SECTION_MIN_DURATION_MS))]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

/// Request to shift a section by a relative number of places.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveSectionRequest {
    /// Negative values move towards the start; the result is clamped to the list bounds.
    #[serde(rename = "move")]
    pub delta: i32,
}

impl From<UpdateSectionRequest> for SectionPatch {
    fn from(value: UpdateSectionRequest) -> Self {
        Self {
            name: Some(value.name),
            duration: Some(Duration::from_millis(value.duration_ms)),
            position: Some(value.position),
        }
    }
}

impl From<PatchSectionRequest> for SectionPatch {
    fn from(value: PatchSectionRequest) -> Self {
        Self {
            name: value.name,
            duration: value.duration_ms.map(Duration::from_millis),
            position: value.position,
        }
    }
}

/// Section as exposed over REST and inside run snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SectionSummary {
    pub id: i64,
    pub presentation: i64,
    pub name: String,
    pub duration_ms: u64,
    pub position: i32,
}

impl From<SectionEntity> for SectionSummary {
    fn from(value: SectionEntity) -> Self {
        Self {
            id: value.id,
            presentation: value.presentation,
            name: value.name,
            duration_ms: millis(value.duration),
            position: value.position,
        }
    }
}

impl From<&Section> for SectionSummary {
    fn from(value: &Section) -> Self {
        Self {
            id: value.id,
            presentation: value.presentation,
            name: value.name.clone(),
            duration_ms: millis(value.duration),
            position: value.position,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// One page of sections.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SectionPage {
    pub data: Vec<SectionSummary>,
    pub page_info: PageInfo,
}
