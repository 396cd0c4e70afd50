use crate::models::{BoundingBox, GeoPoint};

/// Earth's radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Great-circle distance between two optional locations.
///
/// Returns `None` when either location is missing or the coordinates
/// produce a non-finite distance.
#[inline]
pub fn distance_between(a: Option<&GeoPoint>, b: Option<&GeoPoint>) -> Option<f64> {
    let (a, b) = (a?, b?);
    let distance = haversine_distance(a.latitude, a.longitude, b.latitude, b.longitude);
    distance.is_finite().then_some(distance)
}

/// Calculate a bounding box around a center point
///
/// This is much faster than Haversine for pre-filtering.
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;

    // Near the poles cos(lat) goes to zero, so widen to the full longitude range
    let cos_lat = lat.to_radians().cos().abs();
    let lon_delta = if cos_lat < 1e-6 {
        180.0
    } else {
        (radius_km / (111.0 * cos_lat)).min(180.0)
    };

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(
    lat: f64,
    lon: f64,
    bbox: &BoundingBox,
) -> bool {
    lat >= bbox.min_lat
        && lat <= bbox.max_lat
        && lon >= bbox.min_lon
        && lon <= bbox.max_lon
}
