//! Geographic points and proximity helpers.
//!
//! Stores keep a GeoJSON-style point (`[longitude, latitude]`). Proximity
//! queries first narrow candidates with a [`BoundingBox`] that an ordinary
//! B-tree index can serve, then filter and order by exact great-circle
//! distance.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors that can occur when building a [`GeoPoint`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// A coordinate was NaN or infinite.
    #[error("coordinates must be finite numbers")]
    NotFinite,
    /// Longitude outside `[-180, 180]`.
    #[error("longitude {0} is outside -180..=180")]
    Longitude(f64),
    /// Latitude outside `[-90, 90]`.
    #[error("latitude {0} is outside -90..=90")]
    Latitude(f64),
}

/// A validated WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    lng: f64,
    lat: f64,
}

impl GeoPoint {
    /// GeoJSON geometry type for a single point.
    pub const GEOJSON_TYPE: &'static str = "Point";

    /// Create a point from longitude and latitude, in that (GeoJSON) order.
    ///
    /// # Errors
    ///
    /// Returns a [`GeoError`] if either coordinate is not finite or is out of range.
    pub fn new(lng: f64, lat: f64) -> Result<Self, GeoError> {
        if !lng.is_finite() || !lat.is_finite() {
            return Err(GeoError::NotFinite);
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(GeoError::Longitude(lng));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(GeoError::Latitude(lat));
        }
        Ok(Self { lng, lat })
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    /// Coordinates in GeoJSON order.
    #[must_use]
    pub const fn coordinates(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }

    /// Great-circle distance to `other` in meters (haversine formula).
    #[must_use]
    pub fn distance_m(&self, other: &Self) -> f64 {
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + self.lat.to_radians().cos() * other.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// Latitude/longitude ranges that contain every point within a radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box around `center` that contains the circle of `radius_m` meters.
    ///
    /// Latitudes clamp at the poles. When the circle reaches a pole or crosses
    /// the antimeridian the longitude range widens to the full `-180..=180`
    /// instead of wrapping.
    #[must_use]
    pub fn around(center: &GeoPoint, radius_m: f64) -> Self {
        // Angular radius on the same sphere `distance_m` measures on.
        let angle = radius_m / EARTH_RADIUS_M;
        let dlat = angle.to_degrees();
        let min_lat = (center.lat - dlat).max(-90.0);
        let max_lat = (center.lat + dlat).min(90.0);

        // Widest longitude offset of a spherical circle: asin(sin(angle) / cos(lat)).
        let ratio = angle.sin() / center.lat.to_radians().cos();
        let full = min_lat <= -90.0 || max_lat >= 90.0 || !(0.0..1.0).contains(&ratio);
        let (min_lng, max_lng) = if full {
            (-180.0, 180.0)
        } else {
            let dlng = ratio.asin().to_degrees();
            let (lo, hi) = (center.lng - dlng, center.lng + dlng);
            if lo < -180.0 || hi > 180.0 {
                (-180.0, 180.0)
            } else {
                (lo, hi)
            }
        };

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Whether `point` lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}
