//! Great-circle distance and nearest-city lookup.

use crate::error::GuideError;
use crate::models::City;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting anything outside [-90, 90] x [-180, 180]
    /// (and NaN, which fails both range checks).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GuideError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GuideError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds a point without range checks. Callers own the validation.
    pub const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance in kilometers between two points on a sphere of
/// radius [`EARTH_RADIUS_KM`].
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push near-antipodal points just past 1.
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Returns the city closest to `point`.
///
/// Ties go to the city that appears first in `catalog`, so the result is
/// deterministic for any input. An empty catalog is a data error and is
/// reported as [`GuideError::EmptyCatalog`].
pub fn nearest<'a>(point: GeoPoint, catalog: &'a [City]) -> Result<&'a City, GuideError> {
    let mut best: Option<(&City, f64)> = None;
    for city in catalog {
        let d = distance(point, city.location);
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((city, d));
        }
    }
    best.map(|(city, _)| city).ok_or(GuideError::EmptyCatalog)
}
