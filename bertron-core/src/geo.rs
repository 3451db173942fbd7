use error_stack::Report;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Standard GeoJSON point, `coordinates: [longitude, latitude]`. The axis
/// order is load-bearing: the 2dsphere index and every geospatial query
/// operate longitude-first.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl GeoJsonPoint {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A query center in the latitude/longitude order clients speak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidBoundingBox {
    #[error("southwest latitude must be strictly less than northeast latitude")]
    Latitude,
    #[error("southwest longitude must be strictly less than northeast longitude")]
    Longitude,
}

/// Rectangular lat/lng region. Construction enforces southwest < northeast
/// on both axes; boxes wrapping the antimeridian or poles are unsupported.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    southwest: GeoPoint,
    northeast: GeoPoint,
}

impl BoundingBox {
    pub fn new(
        southwest: GeoPoint,
        northeast: GeoPoint,
    ) -> Result<Self, Report<InvalidBoundingBox>> {
        if southwest.latitude >= northeast.latitude {
            return Err(Report::new(InvalidBoundingBox::Latitude).attach(format!(
                "southwest {} >= northeast {}",
                southwest.latitude, northeast.latitude
            )));
        }
        if southwest.longitude >= northeast.longitude {
            return Err(Report::new(InvalidBoundingBox::Longitude).attach(format!(
                "southwest {} >= northeast {}",
                southwest.longitude, northeast.longitude
            )));
        }
        Ok(Self {
            southwest,
            northeast,
        })
    }

    pub fn southwest(&self) -> GeoPoint {
        self.southwest
    }

    pub fn northeast(&self) -> GeoPoint {
        self.northeast
    }

    /// Closed polygon ring in GeoJSON order, counterclockwise from the
    /// southwest corner. This is the shape `$geoWithin` consumes.
    pub fn polygon_ring(&self) -> [[f64; 2]; 5] {
        let sw = self.southwest;
        let ne = self.northeast;
        [
            [sw.longitude, sw.latitude],
            [ne.longitude, sw.latitude],
            [ne.longitude, ne.latitude],
            [sw.longitude, ne.latitude],
            [sw.longitude, sw.latitude],
        ]
    }
}
