use std::time::Duration;

use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{PresentationEntity, SectionEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPresentationDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSectionDocument {
    #[serde(rename = "_id")]
    pub id: i64,
    pub presentation: i64,
    pub name: String,
    pub duration_ms: i64,
    pub position: i32,
}

/// Monotonic sequence used to hand out integer identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub seq: i64,
}

impl From<PresentationEntity> for MongoPresentationDocument {
    fn from(value: PresentationEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<MongoPresentationDocument> for PresentationEntity {
    fn from(value: MongoPresentationDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<SectionEntity> for MongoSectionDocument {
    fn from(value: SectionEntity) -> Self {
        Self {
            id: value.id,
            presentation: value.presentation,
            name: value.name,
            duration_ms: i64::try_from(value.duration.as_millis()).unwrap_or(i64::MAX),
            position: value.position,
        }
    }
}

impl From<MongoSectionDocument> for SectionEntity {
    fn from(value: MongoSectionDocument) -> Self {
        Self {
            id: value.id,
            presentation: value.presentation,
            name: value.name,
            duration: Duration::from_millis(value.duration_ms.max(0) as u64),
            position: value.position,
        }
    }
}

pub fn doc_id(id: i64) -> Document {
    doc! {"_id": id}
}
