use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JsonObject;
use crate::geo::GeoJsonPoint;
use crate::model::Entity;

pub const DEFAULT_FIND_LIMIT: i64 = 100;
pub const MAX_FIND_LIMIT: i64 = 1000;

/// Criteria for the native-filter escape hatch. Filter, projection and sort
/// are handed to the store untranslated.
#[derive(Debug, Clone, PartialEq)]
pub struct FindCriteria {
    pub filter: JsonObject,
    pub projection: Option<JsonObject>,
    pub skip: u64,
    pub limit: i64,
    pub sort: Option<JsonObject>,
}

impl FindCriteria {
    pub fn new(filter: JsonObject) -> Self {
        Self {
            filter,
            projection: None,
            skip: 0,
            limit: DEFAULT_FIND_LIMIT,
            sort: None,
        }
    }
}

/// The two find response modes. A projection makes full entity
/// reconstruction impossible (required fields may be projected away), so
/// projected queries return the store documents as-is instead of silently
/// switching shapes behind one type.
#[derive(Debug, Clone, PartialEq)]
pub enum FindOutcome {
    Entities(Vec<Entity>),
    Projected(Vec<Value>),
}

impl FindOutcome {
    pub fn len(&self) -> usize {
        match self {
            FindOutcome::Entities(entities) => entities.len(),
            FindOutcome::Projected(documents) => documents.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ingest-time annotations stored alongside every entity under `_metadata`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IngestMetadata {
    pub ingested_at: DateTime<Utc>,
    pub schema_version: String,
}

/// A validated record ready to be persisted: the raw (schema-valid) source
/// fields plus the two derived fields computed before the single write.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntityDocument {
    pub uri: String,
    pub record: JsonObject,
    pub geojson: GeoJsonPoint,
    pub metadata: IngestMetadata,
}

impl NewEntityDocument {
    pub fn new(
        uri: String,
        record: JsonObject,
        geojson: GeoJsonPoint,
        metadata: IngestMetadata,
    ) -> Self {
        Self {
            uri,
            record,
            geojson,
            metadata,
        }
    }
}

/// Whether an upsert created a new document or replaced an existing one.
/// Both are success; only the batch statistics distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}
