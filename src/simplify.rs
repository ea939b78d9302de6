//! Geometry reduction for imported tracks.
//!
//! A recorded track carries far more points than a navigable route
//! needs: one maneuver anchor per direction change is enough. This
//! module reduces dense geometry with the Ramer-Douglas-Peucker
//! algorithm so the instruction generator sees only the points where
//! something happens.

use crate::geo::Point;

/// Reduce dense geometry to maneuver points.
///
/// `tolerance_m` controls how far a point may sit from the simplified
/// line before it is kept. Typical values:
/// - 10.0: keeps most direction changes
/// - 50.0: good default for navigation anchors
/// - 100.0: only major turns survive
pub fn maneuver_points(points: &[Point], tolerance_m: f64) -> Vec<Point> {
    rdp(points, tolerance_m)
}

/// Ramer-Douglas-Peucker line simplification.
fn rdp(points: &[Point], tolerance_m: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let first = &points[0];
    let last = &points[points.len() - 1];

    // Find the point with maximum distance from the first-last line
    let mut max_dist = 0.0;
    let mut max_idx = 0;

    for (i, p) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance_m(p, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > tolerance_m {
        // Recurse on both halves
        let mut left = rdp(&points[..=max_idx], tolerance_m);
        let right = rdp(&points[max_idx..], tolerance_m);

        // Remove duplicate junction point
        left.pop();
        left.extend(right);
        left
    } else {
        // All intermediate points are within tolerance
        vec![*first, *last]
    }
}

/// Perpendicular distance from point P to line A-B, in meters.
///
/// Uses a planar approximation with latitude-cosine scaling, accurate
/// for the segment lengths a recorded track produces.
fn perpendicular_distance_m(p: &Point, a: &Point, b: &Point) -> f64 {
    let cos_lat = ((a.lat + b.lat) / 2.0).to_radians().cos();

    let m_per_deg_lat = 111_320.0;
    let m_per_deg_lon = 111_320.0 * cos_lat;

    let ax = a.lon * m_per_deg_lon;
    let ay = a.lat * m_per_deg_lat;
    let bx = b.lon * m_per_deg_lon;
    let by = b.lat * m_per_deg_lat;
    let px = p.lon * m_per_deg_lon;
    let py = p.lat * m_per_deg_lat;

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;

    if len_sq < 1e-10 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }

    let cross = ((px - ax) * dy - (py - ay) * dx).abs();
    cross / len_sq.sqrt()
}
