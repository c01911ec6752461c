use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

/// Presentation row as persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresentationEntity {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Display name of the presentation.
    pub name: String,
}

/// Timed section belonging to a presentation.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionEntity {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Owning presentation identifier.
    pub presentation: i64,
    /// Display name of the section.
    pub name: String,
    /// Time allotted to the section.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "duration_ms")]
    pub duration: Duration,
    /// Ordering key, unique per presentation.
    pub position: i32,
}

/// Sort direction requested by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Columns a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Duration,
    Position,
}

impl SortField {
    /// Field name used both on the wire and as the document key.
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Duration => "duration_ms",
            SortField::Position => "position",
        }
    }
}

/// Window and ordering applied to a listing query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
    pub sort: Option<(SortField, SortDirection)>,
}

impl PageRequest {
    /// Page request without any explicit ordering.
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            sort: None,
        }
    }

    /// Attach an ordering to the request.
    pub fn sorted_by(mut self, field: SortField, direction: SortDirection) -> Self {
        self.sort = Some((field, direction));
        self
    }
}

/// Payload required to insert a section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSection {
    pub presentation: i64,
    pub name: String,
    pub duration: Duration,
    /// When absent the section is appended after the current last position.
    pub position: Option<i32>,
}

/// Partial update applied to a section; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPatch {
    pub name: Option<String>,
    pub duration: Option<Duration>,
    pub position: Option<i32>,
}

impl SectionPatch {
    /// Apply the patch on top of an existing entity.
    pub fn apply_to(&self, section: &mut SectionEntity) {
        if let Some(name) = &self.name {
            section.name = name.clone();
        }
        if let Some(duration) = self.duration {
            section.duration = duration;
        }
        if let Some(position) = self.position {
            section.position = position;
        }
    }
}

/// Order sections the way a run plays them: by position, then by id.
pub fn sort_for_playback(sections: &mut [SectionEntity]) {
    sections.sort_by_key(|section| (section.position, section.id));
}

/// Rewrite positions to a contiguous `0..n` sequence, returning the sections whose position changed.
pub fn compact_positions(sections: &mut [SectionEntity]) -> Vec<SectionEntity> {
    sort_for_playback(sections);
    let mut changed = Vec::new();
    for (index, section) in sections.iter_mut().enumerate() {
        let position = index as i32;
        if section.position != position {
            section.position = position;
            changed.push(section.clone());
        }
    }
    changed
}

/// Move the section `id` by `delta` places inside an already ordered list and renumber it.
///
/// Returns `false` when `id` is not part of the list.
pub fn move_within(sections: &mut Vec<SectionEntity>, id: i64, delta: i32) -> bool {
    let Some(index) = sections.iter().position(|section| section.id == id) else {
        return false;
    };
    let last = sections.len().saturating_sub(1) as i64;
    let target = (index as i64 + i64::from(delta)).clamp(0, last) as usize;
    let section = sections.remove(index);
    sections.insert(target, section);
    for (index, section) in sections.iter_mut().enumerate() {
        section.position = index as i32;
    }
    true
}
