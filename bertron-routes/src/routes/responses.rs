use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use bertron_core::model::Entity;
use bertron_core::query::FindOutcome;

/// The two find response modes, selected by whether the request carried a
/// projection. Serialized transparently; the shape difference is the
/// documents themselves, not a wrapper tag.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum FindDocuments {
    Entities(Vec<Entity>),
    Projected(Vec<Value>),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntitiesResponse {
    pub documents: Vec<Entity>,
    pub count: usize,
}

impl EntitiesResponse {
    pub fn new(documents: Vec<Entity>) -> Self {
        let count = documents.len();
        Self { documents, count }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FindResponse {
    pub documents: FindDocuments,
    pub count: usize,
}

impl From<FindOutcome> for FindResponse {
    fn from(outcome: FindOutcome) -> Self {
        let count = outcome.len();
        let documents = match outcome {
            FindOutcome::Entities(entities) => FindDocuments::Entities(entities),
            FindOutcome::Projected(documents) => FindDocuments::Projected(documents),
        };
        Self { documents, count }
    }
}

/// System health information.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the web server is up and running
    pub web_server: bool,
    /// Whether the web server can access the database server
    pub database: bool,
}

/// System version information.
#[derive(Debug, Serialize, ToSchema)]
pub struct VersionResponse {
    /// The version identifier of the API
    pub api: Option<String>,
    /// The version identifier of the BERtron schema
    pub bertron_schema: Option<String>,
}
