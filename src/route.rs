//! Route model.
//!
//! An immutable snapshot of one computed route: the polyline, the step
//! list bound to polyline indices, and the distance/duration summary.
//! A route is replaced wholesale on every successful build and never
//! patched in place.

use serde::{Deserialize, Serialize};

use crate::geo::{self, Point};
use crate::instructions;

/// Average driving speed assumed for imported geometry, in m/s (~50 km/h).
const DEFAULT_DRIVING_SPEED_MPS: f64 = 13.9;

/// A single maneuver along a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Polyline index the maneuver is bound to.
    pub index: usize,
    /// Display and announcement text.
    pub text: String,
    /// Point along the polyline where the maneuver occurs.
    pub anchor: Point,
}

/// An instruction as delivered by a routing backend or generated for
/// imported geometry: maneuver text bound to a polyline index. The
/// anchor point is resolved when the `Route` is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInstruction {
    pub index: usize,
    pub text: String,
}

/// Total distance and expected travel time of a route.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_m: f64,
    pub duration_s: f64,
}

impl RouteSummary {
    /// Summary distance for display, e.g. "12.38 km".
    pub fn distance_text(&self) -> String {
        format!("{:.2} km", self.distance_m / 1000.0)
    }

    /// Summary duration for display, e.g. "42 min" or "1 h 5 min".
    pub fn duration_text(&self) -> String {
        let minutes = (self.duration_s / 60.0).round() as i64;
        if minutes < 60 {
            format!("{minutes} min")
        } else {
            format!("{} h {} min", minutes / 60, minutes % 60)
        }
    }
}

/// Wire form of a route as exchanged with the host frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePayload {
    pub points: Vec<Point>,
    pub instructions: Vec<RawInstruction>,
    pub summary: RouteSummary,
}

/// An immutable computed route.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    points: Vec<Point>,
    steps: Vec<Step>,
    summary: RouteSummary,
}

impl Route {
    /// Build a route from a polyline and backend instructions.
    ///
    /// Rejects a polyline with fewer than 2 points, an empty
    /// instruction list, and any instruction index outside the
    /// polyline. Nothing degenerate can reach the tracker.
    pub fn new(
        points: Vec<Point>,
        instructions: Vec<RawInstruction>,
        summary: RouteSummary,
    ) -> Result<Route, String> {
        if points.len() < 2 {
            return Err(format!(
                "route polyline needs at least 2 points, got {}",
                points.len()
            ));
        }
        if instructions.is_empty() {
            return Err("route needs at least 1 instruction".to_string());
        }

        let mut steps = Vec::with_capacity(instructions.len());
        for inst in instructions {
            let anchor = points.get(inst.index).copied().ok_or_else(|| {
                format!(
                    "instruction index {} outside polyline of {} points",
                    inst.index,
                    points.len()
                )
            })?;
            steps.push(Step {
                index: inst.index,
                text: inst.text,
                anchor,
            });
        }

        Ok(Route {
            points,
            steps,
            summary,
        })
    }

    /// Build a route from bare geometry, generating instructions from
    /// the turn angles and estimating travel time from the length.
    ///
    /// Used for imported routes that carry no backend instructions.
    pub fn from_geometry(points: Vec<Point>) -> Result<Route, String> {
        let instructions = instructions::generate(&points);
        let distance_m = geo::polyline_length(&points);
        let summary = RouteSummary {
            distance_m,
            duration_s: distance_m / DEFAULT_DRIVING_SPEED_MPS,
        };
        Route::new(points, instructions, summary)
    }

    /// Build a route from its wire form.
    pub fn from_payload(payload: RoutePayload) -> Result<Route, String> {
        Route::new(payload.points, payload.instructions, payload.summary)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn summary(&self) -> &RouteSummary {
        &self.summary
    }

    /// Final polyline point, i.e. the destination.
    pub fn destination(&self) -> Point {
        *self.points.last().expect("validated non-empty polyline")
    }
}
