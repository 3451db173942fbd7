use serde::Deserialize;
use utoipa::ToSchema;

use bertron_core::JsonObject;
use bertron_core::query::DEFAULT_FIND_LIMIT;

const fn default_limit() -> i64 {
    DEFAULT_FIND_LIMIT
}

/// Body of `POST /bertron/find`. Filter, projection and sort are passed to
/// the store's native query language untranslated.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FindRequest {
    #[serde(default)]
    #[schema(value_type = Object)]
    pub filter: JsonObject,
    #[schema(value_type = Object)]
    pub projection: Option<JsonObject>,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[schema(value_type = Object)]
    pub sort: Option<JsonObject>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
    pub filter_json: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BboxParams {
    pub southwest_lat: f64,
    pub southwest_lng: f64,
    pub northeast_lat: f64,
    pub northeast_lng: f64,
    pub filter_json: Option<String>,
}
