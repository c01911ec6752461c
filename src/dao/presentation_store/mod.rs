pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::models::{
    NewSection, PageRequest, PresentationEntity, SectionEntity, SectionPatch,
};
use crate::dao::storage::StorageResult;

pub use memory::MemoryPresentationStore;

/// Abstraction over the persistence layer for presentations and their sections.
pub trait PresentationStore: Send + Sync {
    fn list_presentations(
        &self,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Vec<PresentationEntity>>>;
    fn count_presentations(&self) -> BoxFuture<'static, StorageResult<u64>>;
    fn find_presentation(
        &self,
        id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<PresentationEntity>>>;
    fn create_presentation(&self, name: String)
    -> BoxFuture<'static, StorageResult<PresentationEntity>>;
    /// Delete a presentation together with its sections; `false` when it did not exist.
    fn delete_presentation(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>>;

    fn list_sections(
        &self,
        presentation_id: i64,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Vec<SectionEntity>>>;
    fn count_sections(&self, presentation_id: i64) -> BoxFuture<'static, StorageResult<u64>>;
    fn find_section(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<SectionEntity>>>;
    fn create_section(&self, section: NewSection)
    -> BoxFuture<'static, StorageResult<SectionEntity>>;
    fn update_section(
        &self,
        id: i64,
        patch: SectionPatch,
    ) -> BoxFuture<'static, StorageResult<Option<SectionEntity>>>;
    fn delete_section(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>>;
    /// Move a section by `delta` places within its presentation, returning the new order.
    fn move_section(
        &self,
        id: i64,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<SectionEntity>>>>;

    /// Sections of a presentation in playback order (position, then id).
    fn load_ordered_sections(
        &self,
        presentation_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<SectionEntity>>>;
    /// Renumber every presentation's section positions to `0..n`.
    fn clean_positions(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
