//! Great-circle distance and the distance buckets used across chat and
//! selection.

use crate::models::Coordinate;

const EARTH_RADIUS_KM: f64 = 6_371.0088;

/// Haversine distance between two coordinates, in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Coarse label attached to selection intents and chat messages.
pub fn distance_category(km: f64) -> &'static str {
    if km < 0.25 {
        "near"
    } else if km < 1.0 {
        "mid"
    } else if km < 5.0 {
        "far"
    } else {
        "very_far"
    }
}
