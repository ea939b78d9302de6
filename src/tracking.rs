//! Live-tracking state machine.
//!
//! Consumes raw position fixes and turns them into a current-step
//! pointer, an on-route/off-route classification, and re-route
//! requests. The tracker never calls a collaborator: each fix yields a
//! [`FixOutcome`] describing what the host should do, and the state is
//! already updated by the time the outcome is returned, so a failing
//! side effect cannot roll it back.

use log::debug;
use serde::Serialize;

use crate::geo::{self, Point};
use crate::route::{Route, Step};

/// Advance to the next step when a fix comes this close to the
/// current step's anchor, in meters.
pub const STEP_ADVANCE_RADIUS_M: f64 = 25.0;

/// A fix farther than this from the route polyline is off route.
pub const OFF_ROUTE_THRESHOLD_M: f64 = 50.0;

/// Recenter the view when a followed fix drifts this far from the
/// view center, in meters.
pub const RECENTER_THRESHOLD_M: f64 = 120.0;

/// Route adherence of the latest fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum RouteStatus {
    OnRoute,
    OffRoute { distance_m: f64 },
}

impl RouteStatus {
    /// User-facing status line.
    pub fn text(&self) -> String {
        match self {
            RouteStatus::OnRoute => "On route".to_string(),
            RouteStatus::OffRoute { distance_m } => format!(
                "Off route ({} m), recalculating",
                distance_m.floor() as i64
            ),
        }
    }
}

/// What the host should do after one position fix.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FixOutcome {
    /// New step index, when the fix advanced the pointer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced_to: Option<usize>,
    /// Text of the newly current step, to be announced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announce: Option<String>,
    /// Adherence classification, present whenever a route is installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RouteStatus>,
    /// Request a route rebuild from the fix position.
    pub reroute: bool,
    /// Recenter the view on the fix (follow mode).
    pub recenter: bool,
}

/// Serializable view of the tracker for the host boundary.
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSnapshot {
    pub has_route: bool,
    pub step_index: usize,
    pub off_route_count: u32,
    pub follow: bool,
    pub voice: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_text: Option<String>,
}

/// Navigation state for one active route.
///
/// The current route, step pointer, and off-route counter live here
/// and nowhere else. Installing a route resets the pointer and the
/// counter; only an explicit user action discards a route.
pub struct Tracker {
    route: Option<Route>,
    step_index: usize,
    off_route_count: u32,
    follow: bool,
    voice: bool,
}

impl Tracker {
    pub fn new() -> Tracker {
        Tracker {
            route: None,
            step_index: 0,
            off_route_count: 0,
            follow: true,
            voice: true,
        }
    }

    /// Install a freshly built route, replacing any current one.
    pub fn install(&mut self, route: Route) {
        debug!(
            "installing route: {} points, {} steps",
            route.points().len(),
            route.steps().len()
        );
        self.route = Some(route);
        self.step_index = 0;
        self.off_route_count = 0;
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn off_route_count(&self) -> u32 {
        self.off_route_count
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    pub fn voice(&self) -> bool {
        self.voice
    }

    /// Toggle follow mode, returning the new value.
    pub fn toggle_follow(&mut self) -> bool {
        self.follow = !self.follow;
        self.follow
    }

    /// Toggle voice guidance, returning the new value.
    pub fn toggle_voice(&mut self) -> bool {
        self.voice = !self.voice;
        self.voice
    }

    /// Make a tapped step the current one. Returns it for the host to
    /// focus and announce, or None when there is no such step.
    pub fn select_step(&mut self, index: usize) -> Option<&Step> {
        let route = self.route.as_ref()?;
        let step = route.steps().get(index)?;
        self.step_index = index;
        Some(step)
    }

    /// Process one position fix.
    ///
    /// The checks run in a fixed order: step advance, route adherence,
    /// centering. Each fix advances the step pointer at most once, even
    /// when it is also within range of later anchors; that bounds false
    /// advances from GPS jitter.
    pub fn handle_fix(&mut self, fix: &Point, view_center: Option<&Point>) -> FixOutcome {
        let mut outcome = FixOutcome::default();

        if let Some(route) = &self.route {
            let steps = route.steps();

            // 1. Step advance, clamped at the last step
            if self.step_index < steps.len() - 1 {
                let anchor = &steps[self.step_index].anchor;
                if geo::haversine(fix, anchor) < STEP_ADVANCE_RADIUS_M {
                    self.step_index += 1;
                    outcome.advanced_to = Some(self.step_index);
                    outcome.announce = Some(steps[self.step_index].text.clone());
                    debug!("advanced to step {}", self.step_index);
                }
            }

            // 2. Route adherence with even-counter debounce
            let min_d = geo::min_distance_to_polyline(fix, route.points());
            if min_d <= OFF_ROUTE_THRESHOLD_M {
                self.off_route_count = 0;
                outcome.status = Some(RouteStatus::OnRoute);
            } else {
                self.off_route_count += 1;
                outcome.status = Some(RouteStatus::OffRoute { distance_m: min_d });
                // A single noisy fix never triggers a rebuild; the
                // counter keeps accumulating until an on-route fix, so
                // every even count while astray fires again.
                if self.off_route_count % 2 == 0 {
                    outcome.reroute = true;
                    debug!(
                        "off-route fix #{} ({:.0} m), requesting reroute",
                        self.off_route_count, min_d
                    );
                }
            }
        }

        // 3. Centering while following
        if self.follow {
            if let Some(center) = view_center {
                if geo::haversine(fix, center) > RECENTER_THRESHOLD_M {
                    outcome.recenter = true;
                }
            }
        }

        outcome
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            has_route: self.route.is_some(),
            step_index: self.step_index,
            off_route_count: self.off_route_count,
            follow: self.follow,
            voice: self.voice,
            distance_text: self.route.as_ref().map(|r| r.summary().distance_text()),
            duration_text: self.route.as_ref().map(|r| r.summary().duration_text()),
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker::new()
    }
}
