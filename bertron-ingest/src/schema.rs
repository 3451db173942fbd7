use error_stack::{Report, ResultExt};
use jsonschema::Validator;
use serde_json::Value;
use tracing::info;

use bertron_core::model::Entity;

#[derive(Debug, thiserror::Error)]
pub enum SchemaLoadError {
    #[error("failed to fetch schema over http")]
    Fetch,
    #[error("failed to read schema file")]
    Read,
    #[error("schema is not valid json")]
    Parse,
    #[error("schema is not a json object")]
    NotAnObject,
    #[error("schema document does not compile")]
    Compile,
}

/// Why one record was refused. The two stages gate independently: the
/// published schema may be looser than (and evolves independently of) the
/// canonical model, so passing one says nothing about the other.
#[derive(Debug, thiserror::Error)]
pub enum RecordRejection {
    #[error("record does not satisfy the published schema: {0}")]
    Schema(String),
    #[error("record does not satisfy the entity model: {0}")]
    Model(String),
}

/// The externally published entity schema, loaded once at pipeline
/// construction and never mutated afterwards.
#[derive(Debug)]
pub struct SchemaDocument {
    version: String,
    validator: Validator,
}

impl SchemaDocument {
    /// Load from a local path or an `http(s)://` URL.
    pub async fn load(location: &str) -> Result<SchemaDocument, Report<SchemaLoadError>> {
        info!("loading schema from {location}");

        let value: Value = if location.starts_with("http://") || location.starts_with("https://") {
            let response = reqwest::get(location)
                .await
                .change_context(SchemaLoadError::Fetch)?
                .error_for_status()
                .change_context(SchemaLoadError::Fetch)?;
            response
                .json()
                .await
                .change_context(SchemaLoadError::Parse)?
        } else {
            let raw = tokio::fs::read_to_string(location)
                .await
                .change_context(SchemaLoadError::Read)?;
            serde_json::from_str(&raw).change_context(SchemaLoadError::Parse)?
        };

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<SchemaDocument, Report<SchemaLoadError>> {
        if !value.is_object() {
            return Err(Report::new(SchemaLoadError::NotAnObject));
        }

        let version = value
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let validator = jsonschema::validator_for(&value)
            .map_err(|e| Report::new(SchemaLoadError::Compile).attach(e.to_string()))?;

        Ok(SchemaDocument { version, validator })
    }

    /// The schema's declared version, recorded into each stored document's
    /// ingest metadata.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Dual-stage gate: published JSON Schema first, strict model
    /// construction second. Pure; the record is not mutated.
    pub fn check(&self, record: &Value) -> Result<Entity, RecordRejection> {
        if let Err(error) = self.validator.validate(record) {
            return Err(RecordRejection::Schema(error.to_string()));
        }

        Entity::from_value(record)
            .map_err(|report| RecordRejection::Model(report.current_context().to_string()))
    }
}
