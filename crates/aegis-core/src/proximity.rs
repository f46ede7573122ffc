//! Hazard-to-route proximity test.

use crate::geo::haversine_distance;
use crate::models::GeoPoint;

/// True iff some vertex of `geometry` lies within `radius_m` of `point`.
///
/// This samples vertices rather than computing point-to-segment distance.
/// Provider geometries are densely sampled, so the approximation holds;
/// it can under-detect on sparse hand-built geometries.
pub fn is_near(point: GeoPoint, geometry: &[GeoPoint], radius_m: f64) -> bool {
    geometry
        .iter()
        .any(|vertex| haversine_distance(point, *vertex) <= radius_m)
}
