use std::{collections::BTreeMap, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection, Database,
    bson::{Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::MongoConnection,
    error::{MongoDaoError, MongoResult},
    models::{CounterDocument, MongoPresentationDocument, MongoSectionDocument, doc_id},
};
use crate::dao::{
    models::{
        NewSection, PageRequest, PresentationEntity, SectionEntity, SectionPatch, SortDirection,
        compact_positions, move_within, sort_for_playback,
    },
    presentation_store::PresentationStore,
    storage::StorageResult,
};

const PRESENTATION_COLLECTION_NAME: &str = "presentations";
const SECTION_COLLECTION_NAME: &str = "sections";
const COUNTER_COLLECTION_NAME: &str = "counters";

#[derive(Clone)]
pub struct MongoPresentationStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    connection: RwLock<MongoConnection>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let connection = self.connection.read().await.clone();
        connection.ping().await
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let connection = MongoConnection::open(&self.config).await?;
        *self.connection.write().await = connection;
        Ok(())
    }
}

fn direction(direction: SortDirection) -> i32 {
    match direction {
        SortDirection::Ascending => 1,
        SortDirection::Descending => -1,
    }
}

fn load_err(what: impl Into<String>) -> impl FnOnce(mongodb::error::Error) -> MongoDaoError {
    let what = what.into();
    move |source| MongoDaoError::Load { what, source }
}

fn save_err(what: impl Into<String>) -> impl FnOnce(mongodb::error::Error) -> MongoDaoError {
    let what = what.into();
    move |source| MongoDaoError::Save { what, source }
}

impl MongoPresentationStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let connection = MongoConnection::open(&config).await?;

        let inner = Arc::new(MongoInner {
            connection: RwLock::new(connection),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let presentations = database.collection::<Document>(PRESENTATION_COLLECTION_NAME);
        let name_index = mongodb::IndexModel::builder()
            .keys(doc! {"name": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("presentation_name_idx".to_owned()))
                    .build(),
            )
            .build();
        presentations
            .create_index(name_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PRESENTATION_COLLECTION_NAME,
                index: "name",
                source,
            })?;

        let sections = database.collection::<Document>(SECTION_COLLECTION_NAME);
        let order_index = mongodb::IndexModel::builder()
            .keys(doc! {"presentation": 1, "position": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("section_order_idx".to_owned()))
                    .build(),
            )
            .build();
        sections
            .create_index(order_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SECTION_COLLECTION_NAME,
                index: "presentation,position",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.connection.read().await.database().clone()
    }

    async fn presentations(&self) -> Collection<MongoPresentationDocument> {
        self.database()
            .await
            .collection::<MongoPresentationDocument>(PRESENTATION_COLLECTION_NAME)
    }

    async fn sections(&self) -> Collection<MongoSectionDocument> {
        self.database()
            .await
            .collection::<MongoSectionDocument>(SECTION_COLLECTION_NAME)
    }

    async fn next_id(&self, counter: &'static str) -> MongoResult<i64> {
        let counters = self
            .database()
            .await
            .collection::<CounterDocument>(COUNTER_COLLECTION_NAME);

        counters
            .find_one_and_update(doc! {"_id": counter}, doc! {"$inc": {"seq": 1_i64}})
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::NextId { counter, source })?
            .map(|document| document.seq)
            .ok_or(MongoDaoError::CounterMissing { counter })
    }

    async fn list_presentations(&self, page: PageRequest) -> MongoResult<Vec<PresentationEntity>> {
        let sort = match page.sort {
            Some((_, dir)) => doc! {"name": direction(dir), "_id": 1},
            None => doc! {"_id": 1},
        };
        let documents: Vec<MongoPresentationDocument> = self
            .presentations()
            .await
            .find(doc! {})
            .sort(sort)
            .skip(page.offset)
            .limit(page.limit as i64)
            .await
            .map_err(load_err("presentations"))?
            .try_collect()
            .await
            .map_err(load_err("presentations"))?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn count_presentations(&self) -> MongoResult<u64> {
        self.presentations()
            .await
            .count_documents(doc! {})
            .await
            .map_err(load_err("presentation count"))
    }

    async fn find_presentation(&self, id: i64) -> MongoResult<Option<PresentationEntity>> {
        let document = self
            .presentations()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(load_err(format!("presentation `{id}`")))?;
        Ok(document.map(Into::into))
    }

    async fn create_presentation(&self, name: String) -> MongoResult<PresentationEntity> {
        let id = self.next_id("presentation").await?;
        let presentation = PresentationEntity { id, name };
        let document: MongoPresentationDocument = presentation.clone().into();
        self.presentations()
            .await
            .insert_one(&document)
            .await
            .map_err(save_err(format!("presentation `{id}`")))?;
        Ok(presentation)
    }

    async fn delete_presentation(&self, id: i64) -> MongoResult<bool> {
        let result = self
            .presentations()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(save_err(format!("presentation `{id}`")))?;
        if result.deleted_count == 0 {
            return Ok(false);
        }

        self.sections()
            .await
            .delete_many(doc! {"presentation": id})
            .await
            .map_err(save_err(format!("sections of presentation `{id}`")))?;
        Ok(true)
    }

    async fn list_sections(
        &self,
        presentation_id: i64,
        page: PageRequest,
    ) -> MongoResult<Vec<SectionEntity>> {
        let mut sort = Document::new();
        if let Some((field, dir)) = page.sort {
            sort.insert(field.as_str(), direction(dir));
        }
        sort.insert("_id", -1);
        let documents: Vec<MongoSectionDocument> = self
            .sections()
            .await
            .find(doc! {"presentation": presentation_id})
            .sort(sort)
            .skip(page.offset)
            .limit(page.limit as i64)
            .await
            .map_err(load_err(format!("sections of presentation `{presentation_id}`")))?
            .try_collect()
            .await
            .map_err(load_err(format!("sections of presentation `{presentation_id}`")))?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn count_sections(&self, presentation_id: i64) -> MongoResult<u64> {
        self.sections()
            .await
            .count_documents(doc! {"presentation": presentation_id})
            .await
            .map_err(load_err(format!("section count of `{presentation_id}`")))
    }

    async fn find_section(&self, id: i64) -> MongoResult<Option<SectionEntity>> {
        let document = self
            .sections()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(load_err(format!("section `{id}`")))?;
        Ok(document.map(Into::into))
    }

    /// Push every section at or after `position` one slot down when `position` is taken.
    async fn reserve_position(
        &self,
        presentation_id: i64,
        position: i32,
        exclude: Option<i64>,
    ) -> MongoResult<()> {
        let sections = self.sections().await;
        let mut taken_filter = doc! {"presentation": presentation_id, "position": position};
        let mut shift_filter = doc! {"presentation": presentation_id, "position": {"$gte": position}};
        if let Some(id) = exclude {
            taken_filter.insert("_id", doc! {"$ne": id});
            shift_filter.insert("_id", doc! {"$ne": id});
        }

        let taken = sections
            .count_documents(taken_filter)
            .await
            .map_err(load_err(format!("positions of `{presentation_id}`")))?;
        if taken == 0 {
            return Ok(());
        }

        sections
            .update_many(shift_filter, doc! {"$inc": {"position": 1}})
            .await
            .map_err(save_err(format!("positions of `{presentation_id}`")))?;
        Ok(())
    }

    async fn next_position(&self, presentation_id: i64) -> MongoResult<i32> {
        let last = self
            .sections()
            .await
            .find_one(doc! {"presentation": presentation_id})
            .sort(doc! {"position": -1})
            .await
            .map_err(load_err(format!("positions of `{presentation_id}`")))?;
        Ok(last.map(|section| section.position + 1).unwrap_or(0))
    }

    async fn create_section(&self, section: NewSection) -> MongoResult<SectionEntity> {
        let position = match section.position {
            Some(position) => {
                self.reserve_position(section.presentation, position, None)
                    .await?;
                position
            }
            None => self.next_position(section.presentation).await?,
        };

        let id = self.next_id("section").await?;
        let entity = SectionEntity {
            id,
            presentation: section.presentation,
            name: section.name,
            duration: section.duration,
            position,
        };
        let document: MongoSectionDocument = entity.clone().into();
        self.sections()
            .await
            .insert_one(&document)
            .await
            .map_err(save_err(format!("section `{id}`")))?;
        Ok(entity)
    }

    async fn update_section(
        &self,
        id: i64,
        patch: SectionPatch,
    ) -> MongoResult<Option<SectionEntity>> {
        let Some(mut entity) = self.find_section(id).await? else {
            return Ok(None);
        };
        if let Some(position) = patch.position {
            self.reserve_position(entity.presentation, position, Some(id))
                .await?;
        }

        patch.apply_to(&mut entity);
        let document: MongoSectionDocument = entity.clone().into();
        let result = self
            .sections()
            .await
            .replace_one(doc_id(id), &document)
            .await
            .map_err(save_err(format!("section `{id}`")))?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        Ok(Some(entity))
    }

    async fn delete_section(&self, id: i64) -> MongoResult<bool> {
        let result = self
            .sections()
            .await
            .delete_one(doc_id(id))
            .await
            .map_err(save_err(format!("section `{id}`")))?;
        Ok(result.deleted_count > 0)
    }

    async fn write_positions(&self, sections: &[SectionEntity]) -> MongoResult<()> {
        let collection = self.sections().await;
        for section in sections {
            collection
                .update_one(
                    doc_id(section.id),
                    doc! {"$set": {"position": section.position}},
                )
                .await
                .map_err(save_err(format!("position of section `{}`", section.id)))?;
        }
        Ok(())
    }

    async fn move_section(&self, id: i64, delta: i32) -> MongoResult<Option<Vec<SectionEntity>>> {
        let Some(section) = self.find_section(id).await? else {
            return Ok(None);
        };

        let mut ordered = self.load_ordered_sections(section.presentation).await?;
        compact_positions(&mut ordered);
        if !move_within(&mut ordered, id, delta) {
            return Ok(None);
        }
        self.write_positions(&ordered).await?;
        Ok(Some(ordered))
    }

    async fn load_ordered_sections(&self, presentation_id: i64) -> MongoResult<Vec<SectionEntity>> {
        let documents: Vec<MongoSectionDocument> = self
            .sections()
            .await
            .find(doc! {"presentation": presentation_id})
            .sort(doc! {"position": 1, "_id": 1})
            .await
            .map_err(load_err(format!("sections of presentation `{presentation_id}`")))?
            .try_collect()
            .await
            .map_err(load_err(format!("sections of presentation `{presentation_id}`")))?;

        let mut sections: Vec<SectionEntity> = documents.into_iter().map(Into::into).collect();
        sort_for_playback(&mut sections);
        Ok(sections)
    }

    async fn clean_positions(&self) -> MongoResult<()> {
        let documents: Vec<MongoSectionDocument> = self
            .sections()
            .await
            .find(doc! {})
            .await
            .map_err(load_err("all sections"))?
            .try_collect()
            .await
            .map_err(load_err("all sections"))?;

        let mut grouped: BTreeMap<i64, Vec<SectionEntity>> = BTreeMap::new();
        for document in documents {
            let entity: SectionEntity = document.into();
            grouped.entry(entity.presentation).or_default().push(entity);
        }

        for sections in grouped.values_mut() {
            let changed = compact_positions(sections);
            self.write_positions(&changed).await?;
        }
        Ok(())
    }
}

impl PresentationStore for MongoPresentationStore {
    fn list_presentations(
        &self,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Vec<PresentationEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_presentations(page).await.map_err(Into::into) })
    }

    fn count_presentations(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_presentations().await.map_err(Into::into) })
    }

    fn find_presentation(
        &self,
        id: i64,
    ) -> BoxFuture<'static, StorageResult<Option<PresentationEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_presentation(id).await.map_err(Into::into) })
    }

    fn create_presentation(
        &self,
        name: String,
    ) -> BoxFuture<'static, StorageResult<PresentationEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_presentation(name).await.map_err(Into::into) })
    }

    fn delete_presentation(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_presentation(id).await.map_err(Into::into) })
    }

    fn list_sections(
        &self,
        presentation_id: i64,
        page: PageRequest,
    ) -> BoxFuture<'static, StorageResult<Vec<SectionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_sections(presentation_id, page)
                .await
                .map_err(Into::into)
        })
    }

    fn count_sections(&self, presentation_id: i64) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_sections(presentation_id).await.map_err(Into::into) })
    }

    fn find_section(&self, id: i64) -> BoxFuture<'static, StorageResult<Option<SectionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_section(id).await.map_err(Into::into) })
    }

    fn create_section(
        &self,
        section: NewSection,
    ) -> BoxFuture<'static, StorageResult<SectionEntity>> {
        let store = self.clone();
        Box::pin(async move { store.create_section(section).await.map_err(Into::into) })
    }

    fn update_section(
        &self,
        id: i64,
        patch: SectionPatch,
    ) -> BoxFuture<'static, StorageResult<Option<SectionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.update_section(id, patch).await.map_err(Into::into) })
    }

    fn delete_section(&self, id: i64) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_section(id).await.map_err(Into::into) })
    }

    fn move_section(
        &self,
        id: i64,
        delta: i32,
    ) -> BoxFuture<'static, StorageResult<Option<Vec<SectionEntity>>>> {
        let store = self.clone();
        Box::pin(async move { store.move_section(id, delta).await.map_err(Into::into) })
    }

    fn load_ordered_sections(
        &self,
        presentation_id: i64,
    ) -> BoxFuture<'static, StorageResult<Vec<SectionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .load_ordered_sections(presentation_id)
                .await
                .map_err(Into::into)
        })
    }

    fn clean_positions(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.clean_positions().await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
