//! Planar approximation of "within a distance of a point".
//!
//! The box is not a circle and no great-circle math is involved. Near the
//! poles the longitude span blows up (the cosine approaches zero) and there is
//! no wraparound at the ±180° meridian.

/// Roughly one degree of latitude, in kilometers.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Default search distance for nearby queries, in kilometers.
pub const DEFAULT_MAX_DISTANCE_KM: f64 = 10.0;

/// Inclusive latitude/longitude ranges.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    /// Builds the box spanning `max_distance` kilometers around the given
    /// point.
    pub fn around(latitude: f64, longitude: f64, max_distance: f64) -> Self {
        let lat_delta = max_distance / KM_PER_DEGREE;
        let lon_delta = max_distance / (KM_PER_DEGREE * latitude.to_radians().cos().abs());

        Self {
            min_latitude: latitude - lat_delta,
            max_latitude: latitude + lat_delta,
            min_longitude: longitude - lon_delta,
            max_longitude: longitude + lon_delta,
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}
