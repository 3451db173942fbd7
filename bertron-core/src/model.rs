use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

use crate::JsonObject;

/// The federated repositories entities are aggregated from. Closed in
/// practice; new sources require a schema revision upstream.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq)]
pub enum BerDataSource {
    #[serde(rename = "EMSL")]
    Emsl,
    #[serde(rename = "ESS-DIVE")]
    EssDive,
    #[serde(rename = "JGI")]
    Jgi,
    #[serde(rename = "MONET")]
    Monet,
    #[serde(rename = "NMDC")]
    Nmdc,
}

impl BerDataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BerDataSource::Emsl => "EMSL",
            BerDataSource::EssDive => "ESS-DIVE",
            BerDataSource::Jgi => "JGI",
            BerDataSource::Monet => "MONET",
            BerDataSource::Nmdc => "NMDC",
        }
    }
}

impl Display for BerDataSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declared sample location. Latitude and longitude are required; secondary
/// measurements vary by source (some report them here, some under
/// `properties`) so they stay open JSON values.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[schema(value_type = Object)]
    pub depth: Option<Value>,
    #[schema(value_type = Object)]
    pub elevation: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct AttributeLabel {
    pub label: String,
}

/// One attribute/value pair of source-specific extended metadata. Only the
/// attribute label has a pinned shape; the value payload differs per source.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct AttributeValue {
    pub attribute: AttributeLabel,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub value: JsonObject,
}

/// The canonical sample/record representation exposed by the API.
///
/// Stored documents carry two extra fields (`geojson`, `_metadata`) that are
/// not part of this model; reconstructing an `Entity` from a stored document
/// drops them, which is what keeps storage-only fields off the wire.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct Entity {
    /// Globally unique logical identifier, e.g. `EMSL:<uuid>` or `doi:<doi>`.
    /// Intended unique, but not enforced at the storage layer; `uri` is the
    /// de-facto dedup key.
    pub id: String,
    /// Source-system URI; the upsert key across re-ingestions.
    pub uri: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub ber_data_source: BerDataSource,
    /// Non-empty ordered classification, e.g. `["sample"]` or `["study"]`.
    pub entity_type: Vec<String>,
    pub coordinates: Coordinates,
    pub properties: Option<Vec<AttributeValue>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelViolation {
    #[error("record does not deserialize into the entity model")]
    Shape,
    #[error("latitude must be between -90 and 90")]
    LatitudeRange,
    #[error("longitude must be between -180 and 180")]
    LongitudeRange,
    #[error("entity_type must contain at least one classification")]
    EmptyEntityType,
}

impl Entity {
    /// Strict construction from a raw record: typed deserialization plus the
    /// numeric-range and non-emptiness constraints the serde shape alone
    /// cannot express. Pure; the input is left untouched.
    pub fn from_value(value: &Value) -> Result<Entity, Report<ModelViolation>> {
        let entity: Entity = serde_json::from_value(value.clone())
            .change_context(ModelViolation::Shape)?;
        entity.validate()?;
        Ok(entity)
    }

    pub fn validate(&self) -> Result<(), Report<ModelViolation>> {
        if self.entity_type.is_empty() {
            return Err(Report::new(ModelViolation::EmptyEntityType));
        }
        self.coordinates.validate()
    }

    /// Preferred human-readable handle for log lines, mirroring how records
    /// are reported during ingestion.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl Coordinates {
    pub fn validate(&self) -> Result<(), Report<ModelViolation>> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Report::new(ModelViolation::LatitudeRange)
                .attach(format!("latitude was {}", self.latitude)));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Report::new(ModelViolation::LongitudeRange)
                .attach(format!("longitude was {}", self.longitude)));
        }
        Ok(())
    }
}
