//! Great-circle distance and nearest-record lookup.
//!
//! Shared by the location resolver (nearest reference record to a coordinate
//! fix) and the event search engine (distance ranking).

use crate::models::{Coordinates, LocationRecord};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers-to-miles conversion factor.
pub const KM_TO_MILES: f64 = 0.621371;

/// Haversine distance between two points, in kilometers.
///
/// Pure and symmetric: `distance(a, b) == distance(b, a)`, and zero for
/// identical points.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Finds the reference record closest to `point` by exhaustive scan.
///
/// Minimum distance wins; ties resolve to the first record in dataset order.
/// Returns `None` only when the dataset is empty.
pub fn find_nearest<'a>(
    locations: &'a [LocationRecord],
    point: Coordinates,
) -> Option<&'a LocationRecord> {
    let mut nearest: Option<&LocationRecord> = None;
    let mut min_distance = f64::INFINITY;

    for record in locations {
        let d = distance(
            point.latitude,
            point.longitude,
            record.latitude,
            record.longitude,
        );
        if d < min_distance {
            min_distance = d;
            nearest = Some(record);
        }
    }

    nearest
}
