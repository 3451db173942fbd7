use error_stack::Report;
use serde_json::Value;

use bertron_core::geo::GeoJsonPoint;

#[derive(Debug, thiserror::Error)]
pub enum ProjectionError {
    #[error("record has no coordinates object")]
    MissingCoordinates,
    #[error("coordinates are missing a numeric latitude or longitude")]
    MissingAxis,
}

/// Derive the geospatial index field from a record's declared coordinates.
/// Longitude-first ordering is mandatory: downstream geospatial queries
/// operate in that axis order. Purely additive; the record is not touched.
pub fn project(record: &Value) -> Result<GeoJsonPoint, Report<ProjectionError>> {
    let coordinates = record
        .get("coordinates")
        .and_then(Value::as_object)
        .ok_or_else(|| Report::new(ProjectionError::MissingCoordinates))?;

    let latitude = coordinates.get("latitude").and_then(Value::as_f64);
    let longitude = coordinates.get("longitude").and_then(Value::as_f64);

    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Ok(GeoJsonPoint::new(longitude, latitude)),
        _ => Err(Report::new(ProjectionError::MissingAxis)),
    }
}
