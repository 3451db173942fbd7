use std::path::Path;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info};

use bertron_core::EntityRepository;
use bertron_core::query::{IngestMetadata, NewEntityDocument, UpsertOutcome};
use bertron_core::result::RepoResult;

use crate::projector;
use crate::schema::SchemaDocument;
use crate::stats::IngestStats;

/// Transforms batches of raw JSON records into persisted, query-ready
/// entities, idempotently. Holds the repository and the schema it was
/// constructed with; the schema never changes after construction.
pub struct Ingestor<R> {
    repo: R,
    schema: SchemaDocument,
}

impl<R: EntityRepository> Ingestor<R> {
    pub fn new(repo: R, schema: SchemaDocument) -> Self {
        Self { repo, schema }
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    /// Drop the persisted entity collection. Pre-batch reset; only ever
    /// runs on explicit request.
    pub async fn clean(&self) -> RepoResult<()> {
        self.repo.clean().await
    }

    /// Declare the indexes the query surface needs. Idempotent.
    pub async fn ensure_indexes(&self) -> RepoResult<()> {
        self.repo.ensure_indexes().await
    }

    /// Ingest one file holding a single record or an array of records.
    /// Records are processed independently in file order; one record's
    /// failure never aborts its siblings. An unreadable or malformed file
    /// contributes only `error = 1`.
    pub async fn ingest_file(&self, path: &Path) -> IngestStats {
        let mut stats = IngestStats::default();

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("error processing file {}: {e}", path.display());
                stats.error += 1;
                return stats;
            }
        };

        let data: Value = match serde_json::from_str(&raw) {
            Ok(data) => data,
            Err(e) => {
                error!("error processing file {}: {e}", path.display());
                stats.error += 1;
                return stats;
            }
        };

        let records = match data {
            Value::Array(records) => records,
            single => vec![single],
        };
        stats.processed = records.len() as u64;

        for record in records {
            self.ingest_record(record, &mut stats).await;
        }

        stats
    }

    /// Ingest every `*.json` file directly under a directory
    /// (non-recursive), summing per-file statistics.
    pub async fn ingest_directory(&self, path: &Path) -> IngestStats {
        let mut total = IngestStats::default();

        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("error reading directory {}: {e}", path.display());
                total.error += 1;
                return total;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let file_path = entry.path();
            if file_path.extension().is_some_and(|ext| ext == "json") {
                info!("processing file: {}", file_path.display());
                total += self.ingest_file(&file_path).await;
            }
        }

        total
    }

    async fn ingest_record(&self, record: Value, stats: &mut IngestStats) {
        let entity = match self.schema.check(&record) {
            Ok(entity) => {
                stats.valid += 1;
                entity
            }
            Err(rejection) => {
                error!("validation error: {rejection}");
                stats.invalid += 1;
                return;
            }
        };

        let geojson = match projector::project(&record) {
            Ok(geojson) => geojson,
            Err(report) => {
                error!(
                    "invalid coordinates format for entity {}: {report:?}",
                    entity.display_name()
                );
                stats.error += 1;
                return;
            }
        };

        let metadata = IngestMetadata {
            ingested_at: Utc::now(),
            schema_version: self.schema.version().to_string(),
        };

        let Value::Object(fields) = record else {
            // a record that parsed into an Entity is always an object
            stats.error += 1;
            return;
        };

        let document = NewEntityDocument::new(entity.uri.clone(), fields, geojson, metadata);

        match self.repo.upsert(document).await {
            Ok(UpsertOutcome::Inserted) => {
                info!("inserted entity: {}", entity.display_name());
                stats.inserted += 1;
            }
            Ok(UpsertOutcome::Updated) => {
                info!("updated entity: {}", entity.display_name());
            }
            Err(report) => {
                error!(
                    "error upserting entity {}: {report:?}",
                    entity.display_name()
                );
                stats.error += 1;
            }
        }
    }
}
