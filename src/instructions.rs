//! Instruction generation for imported geometry.
//!
//! Routes computed by the routing backend arrive with instructions
//! attached; imported geometry does not. This module derives maneuver
//! instructions from the turn angles between consecutive polyline
//! segments and binds them to polyline indices for the route builder.

use serde::Serialize;

use crate::geo::{bearing, haversine, Point};
use crate::route::RawInstruction;

/// Turn direction categories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Start,
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
    Arrive,
}

/// Generate instructions for a polyline.
///
/// Produces a start instruction, one turn instruction per interior
/// point, and an arrival instruction. A polyline with fewer than 2
/// points yields nothing (and fails route validation downstream).
pub fn generate(points: &[Point]) -> Vec<RawInstruction> {
    if points.len() < 2 {
        return Vec::new();
    }

    let mut instructions = Vec::with_capacity(points.len());

    instructions.push(RawInstruction {
        index: 0,
        text: "Start navigation".to_string(),
    });

    for i in 1..points.len() - 1 {
        let dist = haversine(&points[i - 1], &points[i]);
        let turn = compute_turn(&points[i - 1], &points[i], &points[i + 1]);

        instructions.push(RawInstruction {
            index: i,
            text: format!("In {}, {}", format_distance(dist), turn_to_text(turn)),
        });
    }

    let last = points.len() - 1;
    let dist = haversine(&points[last - 1], &points[last]);
    instructions.push(RawInstruction {
        index: last,
        text: format!("In {}, arrive at destination", format_distance(dist)),
    });

    instructions
}

/// Compute the turn direction at point B given the approach from A
/// and the exit toward C.
fn compute_turn(a: &Point, b: &Point, c: &Point) -> Turn {
    let bearing_ab = bearing(a, b);
    let bearing_bc = bearing(b, c);

    // Relative angle: positive = right turn, negative = left turn
    let mut angle = bearing_bc - bearing_ab;

    // Normalize to [-180, 180]
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }

    classify_turn(angle)
}

/// Classify a relative bearing angle into a turn direction.
fn classify_turn(angle: f64) -> Turn {
    let abs_angle = angle.abs();

    if abs_angle > 170.0 {
        Turn::UTurn
    } else if abs_angle > 120.0 {
        if angle > 0.0 { Turn::SharpRight } else { Turn::SharpLeft }
    } else if abs_angle > 60.0 {
        if angle > 0.0 { Turn::Right } else { Turn::Left }
    } else if abs_angle > 20.0 {
        if angle > 0.0 { Turn::SlightRight } else { Turn::SlightLeft }
    } else {
        Turn::Straight
    }
}

fn turn_to_text(turn: Turn) -> &'static str {
    match turn {
        Turn::Start => "start navigation",
        Turn::Straight => "continue straight",
        Turn::SlightLeft => "keep slightly left",
        Turn::Left => "turn left",
        Turn::SharpLeft => "turn sharp left",
        Turn::SlightRight => "keep slightly right",
        Turn::Right => "turn right",
        Turn::SharpRight => "turn sharp right",
        Turn::UTurn => "make a U-turn",
        Turn::Arrive => "arrive at destination",
    }
}

fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.1} km", meters / 1000.0)
    } else {
        format!("{} m", (meters / 10.0).round() as i64 * 10)
    }
}
