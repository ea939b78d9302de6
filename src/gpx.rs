//! GPX import.
//!
//! Wraps the `gpx` crate and extracts planned routes (`<rte>`) and
//! recorded tracks (`<trk>`, segments flattened) as bare geometry.
//! A planned route becomes navigable directly; a recorded track is
//! first reduced to maneuver points so the instruction generator only
//! sees direction changes.

use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::geo::Point;
use crate::route::Route;
use crate::simplify;

/// Default maneuver-point tolerance for recorded tracks, in meters.
pub const DEFAULT_TRACK_TOLERANCE_M: f64 = 50.0;

/// A named geometry extracted from a GPX file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedPath {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub points: Vec<Point>,
}

/// Route and track geometry extracted from a GPX file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpxImport {
    pub routes: Vec<NamedPath>,
    pub tracks: Vec<NamedPath>,
}

/// Parse a GPX file from any reader.
pub fn parse<R: Read>(reader: R) -> Result<GpxImport, String> {
    let gpx = gpx::read(reader).map_err(|e| format!("GPX parse error: {e}"))?;

    let tracks = gpx
        .tracks
        .iter()
        .map(|t| {
            let points = t
                .segments
                .iter()
                .flat_map(|seg| seg.points.iter())
                .map(|wp| Point {
                    lat: wp.point().y(),
                    lon: wp.point().x(),
                })
                .collect();

            NamedPath {
                name: t.name.clone(),
                points,
            }
        })
        .collect();

    let routes = gpx
        .routes
        .iter()
        .map(|r| {
            let points = r
                .points
                .iter()
                .map(|wp| Point {
                    lat: wp.point().y(),
                    lon: wp.point().x(),
                })
                .collect();

            NamedPath {
                name: r.name.clone(),
                points,
            }
        })
        .collect();

    Ok(GpxImport { routes, tracks })
}

/// Parse GPX from a byte slice.
pub fn parse_bytes(data: &[u8]) -> Result<GpxImport, String> {
    parse(data)
}

/// Convert a planned GPX route to a navigable route.
///
/// Planned routes are already sparse, so every point becomes a
/// potential maneuver anchor.
pub fn route_from_planned(path: &NamedPath) -> Result<Route, String> {
    Route::from_geometry(path.points.clone())
}

/// Convert a recorded GPX track to a navigable route.
///
/// The track is reduced to maneuver points first; `tolerance_m`
/// controls how aggressively (see [`simplify::maneuver_points`]).
pub fn route_from_track(path: &NamedPath, tolerance_m: f64) -> Result<Route, String> {
    let points = simplify::maneuver_points(&path.points, tolerance_m);
    Route::from_geometry(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <name>Recorded Drive</name>
    <trkseg>
      <trkpt lat="13.0827" lon="80.2707"></trkpt>
      <trkpt lat="13.0900" lon="80.2750"></trkpt>
      <trkpt lat="13.1000" lon="80.2760"></trkpt>
    </trkseg>
  </trk>
  <rte>
    <name>Planned Route</name>
    <rtept lat="13.0000" lon="80.2000"></rtept>
    <rtept lat="13.0100" lon="80.2000"></rtept>
    <rtept lat="13.0100" lon="80.2100"></rtept>
  </rte>
</gpx>"#;

    #[test]
    fn parse_minimal_gpx() {
        let data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();

        assert_eq!(data.tracks.len(), 1);
        assert_eq!(data.tracks[0].name.as_deref(), Some("Recorded Drive"));
        assert_eq!(data.tracks[0].points.len(), 3);

        let p = &data.tracks[0].points[0];
        assert!((p.lat - 13.0827).abs() < 1e-6);
        assert!((p.lon - 80.2707).abs() < 1e-6);

        assert_eq!(data.routes.len(), 1);
        assert_eq!(data.routes[0].name.as_deref(), Some("Planned Route"));
        assert_eq!(data.routes[0].points.len(), 3);
    }

    #[test]
    fn parse_empty_gpx() {
        let empty = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
</gpx>"#;

        let data = parse_bytes(empty.as_bytes()).unwrap();
        assert!(data.tracks.is_empty());
        assert!(data.routes.is_empty());
    }

    #[test]
    fn parse_invalid_xml_returns_error() {
        assert!(parse_bytes(b"not xml at all").is_err());
    }

    #[test]
    fn parse_multi_segment_track_flattens() {
        let gpx = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test"
     xmlns="http://www.topografix.com/GPX/1/1">
  <trk>
    <trkseg>
      <trkpt lat="13.00" lon="80.00"></trkpt>
      <trkpt lat="13.01" lon="80.01"></trkpt>
    </trkseg>
    <trkseg>
      <trkpt lat="13.02" lon="80.02"></trkpt>
      <trkpt lat="13.03" lon="80.03"></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

        let data = parse_bytes(gpx.as_bytes()).unwrap();
        assert_eq!(data.tracks[0].points.len(), 4);
    }

    #[test]
    fn planned_route_becomes_navigable() {
        let data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();
        let route = route_from_planned(&data.routes[0]).unwrap();

        assert_eq!(route.points().len(), 3);
        assert_eq!(route.steps().first().unwrap().text, "Start navigation");
        assert!(route.summary().distance_m > 1_000.0);
    }

    #[test]
    fn recorded_track_becomes_navigable() {
        let data = parse_bytes(MINIMAL_GPX.as_bytes()).unwrap();
        let route = route_from_track(&data.tracks[0], DEFAULT_TRACK_TOLERANCE_M).unwrap();

        // Reduction keeps at least the endpoints
        assert!(route.points().len() >= 2);
        assert!(route.steps().last().unwrap().text.contains("arrive"));
    }

    #[test]
    fn empty_track_fails_conversion() {
        let path = NamedPath {
            name: None,
            points: Vec::new(),
        };
        assert!(route_from_track(&path, 50.0).is_err());
    }
}
