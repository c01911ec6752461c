use std::{sync::Arc, time::Duration};

use crate::dao::models::{SectionEntity, sort_for_playback};

/// Section as seen by a run: detached from storage and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Storage identifier of the section.
    pub id: i64,
    /// Presentation the section belongs to.
    pub presentation: i64,
    /// Display name.
    pub name: String,
    /// Time allotted to the section.
    pub duration: Duration,
    /// Ordering key the run was built from.
    pub position: i32,
}

impl From<SectionEntity> for Section {
    fn from(value: SectionEntity) -> Self {
        Self {
            id: value.id,
            presentation: value.presentation,
            name: value.name,
            duration: value.duration,
            position: value.position,
        }
    }
}

/// Ordered, immutable list of sections captured when a run is created.
///
/// Edits made to the presentation afterwards are not visible to the run holding the snapshot.
#[derive(Debug, Clone, Default)]
pub struct SectionSnapshot {
    sections: Arc<[Section]>,
}

impl SectionSnapshot {
    /// Number of sections in the run.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the presentation had no sections when the run was created.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section at `index` in playback order.
    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// Iterate sections in playback order.
    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }
}

impl From<Vec<SectionEntity>> for SectionSnapshot {
    fn from(mut entities: Vec<SectionEntity>) -> Self {
        sort_for_playback(&mut entities);
        let sections: Vec<Section> = entities.into_iter().map(Section::from).collect();
        Self {
            sections: sections.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_orders_by_position() {
        let entities = vec![
            SectionEntity {
                id: 2,
                presentation: 1,
                name: "Second".into(),
                duration: Duration::from_secs(3),
                position: 1,
            },
            SectionEntity {
                id: 1,
                presentation: 1,
                name: "First".into(),
                duration: Duration::from_secs(2),
                position: 0,
            },
        ];

        let snapshot = SectionSnapshot::from(entities);
        let names: Vec<_> = snapshot.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert!(snapshot.get(2).is_none());
    }
}
