//! Geographic math.
//!
//! Platform-agnostic distance and bearing computations on WGS84
//! coordinates (lat/lon in degrees). Shared by the route model, the
//! instruction generator, and the live-tracking state machine.

use serde::{Deserialize, Serialize};

/// A geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

/// Earth radius in meters (spherical approximation).
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
pub fn haversine(a: &Point, b: &Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Compute the initial bearing from point A to point B in degrees [0, 360).
pub fn bearing(a: &Point, b: &Point) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Total length of a polyline in meters.
pub fn polyline_length(points: &[Point]) -> f64 {
    points
        .windows(2)
        .map(|w| haversine(&w[0], &w[1]))
        .sum()
}

/// Distance from a point to the line segment v-w, in meters.
///
/// The projection parameter t is computed in the raw (lat, lon) plane
/// and clamped to [0, 1], so the nearest point is constrained to the
/// segment. The unscaled plane is a deliberate simplification: route
/// segments are short relative to the Earth's radius, and the returned
/// value is still a true haversine distance to the projected point.
pub fn point_to_segment_distance(p: &Point, v: &Point, w: &Point) -> f64 {
    let dlat = w.lat - v.lat;
    let dlon = w.lon - v.lon;
    let len_sq = dlat * dlat + dlon * dlon;

    if len_sq == 0.0 {
        // Degenerate segment, measure to the endpoint
        return haversine(p, v);
    }

    let t = ((p.lat - v.lat) * dlat + (p.lon - v.lon) * dlon) / len_sq;
    let t = t.clamp(0.0, 1.0);

    let proj = Point {
        lat: v.lat + t * dlat,
        lon: v.lon + t * dlon,
    };
    haversine(p, &proj)
}

/// Minimum distance from a point to a polyline, in meters.
///
/// The polyline must have at least 2 points. Shorter input is a caller
/// bug; route construction rejects it before anything is installed.
pub fn min_distance_to_polyline(p: &Point, points: &[Point]) -> f64 {
    debug_assert!(points.len() >= 2, "polyline needs at least 2 points");

    points
        .windows(2)
        .map(|w| point_to_segment_distance(p, &w[0], &w[1]))
        .fold(f64::INFINITY, f64::min)
}
