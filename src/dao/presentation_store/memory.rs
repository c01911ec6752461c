//! Process-local store used when no database is configured and by the test suite.

use std::{cmp::Ordering, sync::Arc};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::PresentationStore;
use crate::dao::{
    models::{
        NewSection, PageRequest, PresentationEntity, SectionEntity, SectionPatch, SortDirection,
        SortField, compact_positions, move_within, sort_for_playback,
    },
    storage::StorageResult,
};

#[derive(Clone, Default)]
pub struct MemoryPresentationStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    last_presentation_id: i64,
    last_section_id: i64,
    presentations: IndexMap<i64, PresentationEntity>,
    sections: IndexMap<i64, SectionEntity>,
}

impl MemoryState {
    fn sections_of(&self, presentation_id: i64) -> Vec<SectionEntity> {
        self.sections
            .values()
            .filter(|section| section.presentation == presentation_id)
            .cloned()
            .collect()
    }

    /// Make room for `position` by pushing every later section of the presentation down one slot.
    fn reserve_position(&mut self, presentation_id: i64, position: i32, exclude: Option<i64>) {
        let taken = self.sections.values().any(|section| {
            section.presentation == presentation_id
                && section.position == position
                && Some(section.id) != exclude
        });
        if !taken {
            return;
        }
        for section in self.sections.values_mut() {
            if section.presentation == presentation_id
                && section.position >= position
                && Some(section.id) != exclude
            {
                section.position += 1;
            }
        }
    }

    fn next_position(&self, presentation_id: i64) -> i32 {
        self.sections
            .values()
            .filter(|section| section.presentation == presentation_id)
            .map(|section| section.position + 1)
            .max()
            .unwrap_or(0)
    }
}

impl MemoryPresentationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare_sections(a: &SectionEntity, b: &SectionEntity, field: SortField) -> Ordering {
    match field {
        SortField::Name => a.name.cmp(&b.name),
        SortField::Duration => a.duration.cmp(&b.duration),
        SortField::Position => a.position.cmp(&b.position),
    }
}

fn window<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

impl PresentationStore for MemoryPresentationStore {
    fn list_presentations(
        &self,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Vec<PresentationEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let guard = inner.read().await;
            let mut items: Vec<_> = guard.presentations.values().cloned().collect();
            if let Some((_, direction)) = page.sort {
                items.sort_by(|a, b| match direction {
                    SortDirection::Ascending => a.name.cmp(&b.name),
                    SortDirection::Descending => b.name.cmp(&a.name),
                });
            }
            Ok(window(items, page))
        })
    }

    fn count_presentations(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.presentations.len() as u64) })
    }

    fn find_presentation(
        &self,
        id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<PresentationEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.presentations.get(&id).cloned()) })
    }

    fn create_presentation(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<PresentationEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            guard.last_presentation_id += 1;
            let presentation = PresentationEntity {
                id: guard.last_presentation_id,
                name,
            };
            guard
                .presentations
                .insert(presentation.id, presentation.clone());
            Ok(presentation)
        })
    }

    fn delete_presentation(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            if guard.presentations.shift_remove(&id).is_none() {
                return Ok(false);
            }
            guard.sections.retain(|_, section| section.presentation != id);
            Ok(true)
        })
    }

    fn list_sections(
        &self,
        presentation_id: i64,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Vec<SectionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut items = inner.read().await.sections_of(presentation_id);
            match page.sort {
                Some((field, SortDirection::Ascending)) => {
                    items.sort_by(|a, b| compare_sections(a, b, field).then(b.id.cmp(&a.id)))
                }
                Some((field, SortDirection::Descending)) => {
                    items.sort_by(|a, b| compare_sections(b, a, field).then(b.id.cmp(&a.id)))
                }
                None => items.sort_by(|a, b| b.id.cmp(&a.id)),
            }
            Ok(window(items, page))
        })
    }

    fn count_sections(&self, presentation_id: i64) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let guard = inner.read().await;
            Ok(guard
                .sections
                .values()
                .filter(|section| section.presentation == presentation_id)
                .count() as u64)
        })
    }

    fn find_section(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<SectionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.read().await.sections.get(&id).cloned()) })
    }

    fn create_section(
        &self,
        section: NewSection,
    ) -> BoxFuture<'static, StorageResult<SectionEntity>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            let position = match section.position {
                Some(position) => {
                    guard.reserve_position(section.presentation, position, None);
                    position
                }
                None => guard.next_position(section.presentation),
            };
            guard.last_section_id += 1;
            let entity = SectionEntity {
                id: guard.last_section_id,
                presentation: section.presentation,
                name: section.name,
                duration: section.duration,
                position,
            };
            guard.sections.insert(entity.id, entity.clone());
            Ok(entity)
        })
    }

    fn update_section(
        &self,
        id: i64,
        patch: SectionPatch,
    ) -> BoxFuture<'static, StorageResult<Option<SectionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            let Some(presentation_id) = guard.sections.get(&id).map(|s| s.presentation) else {
                return Ok(None);
            };
            if let Some(position) = patch.position {
                guard.reserve_position(presentation_id, position, Some(id));
            }
            let Some(section) = guard.sections.get_mut(&id) else {
                return Ok(None);
            };
            patch.apply_to(section);
            Ok(Some(section.clone()))
        })
    }

    fn delete_section(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.write().await.sections.shift_remove(&id).is_some()) })
    }

    fn move_section(
        &self,
        id: i64,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<SectionEntity>>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            let Some(presentation_id) = guard.sections.get(&id).map(|s| s.presentation) else {
                return Ok(None);
            };
            let mut ordered = guard.sections_of(presentation_id);
            compact_positions(&mut ordered);
            if !move_within(&mut ordered, id, delta) {
                return Ok(None);
            }
            for section in &ordered {
                guard.sections.insert(section.id, section.clone());
            }
            Ok(Some(ordered))
        })
    }

    fn load_ordered_sections(
        &self,
        presentation_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<SectionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut sections = inner.read().await.sections_of(presentation_id);
            sort_for_playback(&mut sections);
            Ok(sections)
        })
    }

    fn clean_positions(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut guard = inner.write().await;
            let presentation_ids: Vec<i64> = guard.presentations.keys().copied().collect();
            for presentation_id in presentation_ids {
                let mut ordered = guard.sections_of(presentation_id);
                for section in compact_positions(&mut ordered) {
                    guard.sections.insert(section.id, section);
                }
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
