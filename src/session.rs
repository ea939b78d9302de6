//! Navigation session.
//!
//! Owns the tracker and coordinates it with the host collaborators:
//! the map view, the voice announcer, and the route planner. Events
//! arrive on a single channel and are processed one at a time in
//! arrival order. The only suspending operation, route building, is
//! delegated to the planner and completes by sending `RouteReady` or
//! `BuildFailed` back on the same channel, so fix handling keeps
//! running against the stale route until the new one is installed.

use std::fmt;
use std::sync::mpsc::Receiver;

use log::{debug, info, warn};

use crate::geo::Point;
use crate::route::Route;
use crate::tracking::{FixOutcome, Tracker};

/// Zoom hint for follow-mode recentering.
pub const FOLLOW_ZOOM: u8 = 16;

/// Zoom hint when jumping to a step or the live position.
pub const FOCUS_ZOOM: u8 = 17;

/// Why a route build produced no route.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildFailure {
    /// A place query did not resolve to a coordinate.
    GeocodeNotFound { query: String },
    /// The routing backend returned no usable route. Network errors,
    /// no-path-found, and service errors all collapse here.
    RouteFailed { reason: String },
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildFailure::GeocodeNotFound { query } => {
                write!(f, "Could not geocode \"{query}\"")
            }
            BuildFailure::RouteFailed { reason } => {
                write!(f, "Could not build route: {reason}")
            }
        }
    }
}

/// One event on the session timeline.
#[derive(Debug)]
pub enum Event {
    /// A raw position fix from the position source.
    Fix(Point),
    /// The position source failed for one reading.
    PositionError(String),
    /// User asked for a route between two place queries.
    BuildRoute { from: String, to: String },
    /// The planner finished a build.
    RouteReady(Route),
    /// The planner could not produce a route.
    BuildFailed(BuildFailure),
    /// User tapped a step in the list.
    SelectStep(usize),
    /// User toggled follow mode.
    ToggleFollow,
    /// User toggled voice guidance.
    ToggleVoice,
    /// User asked to jump to the live position.
    Locate,
}

/// Route building collaborator.
///
/// Both calls are fire-and-forget: the planner geocodes and calls the
/// routing backend on its own time and reports back by sending
/// [`Event::RouteReady`] or [`Event::BuildFailed`] on the session
/// channel. Timeouts are the planner's responsibility.
pub trait RoutePlanner {
    /// Resolve two place queries, then compute a route between them.
    fn begin_query(&mut self, from: &str, to: &str);
    /// Compute a route between two known coordinates.
    fn begin_coords(&mut self, from: Point, to: Point);
}

/// Map view collaborator.
pub trait MapView {
    /// Current view center, if the view is ready.
    fn center(&self) -> Option<Point>;
    fn recenter(&mut self, at: &Point, zoom_hint: u8);
    fn fly_to(&mut self, at: &Point, zoom_hint: u8);
    fn highlight_step(&mut self, index: usize);
    fn set_status(&mut self, status: &str);
}

/// Voice guidance collaborator. A new announcement supersedes any
/// in-progress utterance. The session only announces while voice
/// guidance is on.
pub trait VoiceAnnouncer {
    fn announce(&mut self, text: &str);
    fn cancel(&mut self);
}

/// Parse a raw "lat,lon" literal.
///
/// The fast path that bypasses geocoding: a query that is already a
/// coordinate pair is used directly.
pub fn parse_lat_lon(s: &str) -> Option<Point> {
    let (lat, lon) = s.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(Point { lat, lon })
}

/// The single consumer of the event timeline.
pub struct NavSession<P, M, V> {
    tracker: Tracker,
    planner: P,
    map: M,
    voice: V,
    destination: Option<Point>,
    last_fix: Option<Point>,
    build_pending: bool,
}

impl<P: RoutePlanner, M: MapView, V: VoiceAnnouncer> NavSession<P, M, V> {
    pub fn new(planner: P, map: M, voice: V) -> Self {
        NavSession {
            tracker: Tracker::new(),
            planner,
            map,
            voice,
            destination: None,
            last_fix: None,
            build_pending: false,
        }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Drain the event channel until every sender is gone.
    pub fn run(&mut self, events: Receiver<Event>) {
        for event in events {
            self.process(event);
        }
    }

    /// Handle one event to completion.
    pub fn process(&mut self, event: Event) {
        match event {
            Event::Fix(fix) => self.on_fix(fix),
            Event::PositionError(reason) => {
                // Surfaced to the user by the position source itself;
                // tracking state stays untouched.
                warn!("position source error: {reason}");
            }
            Event::BuildRoute { from, to } => self.on_build(&from, &to),
            Event::RouteReady(route) => self.on_route_ready(route),
            Event::BuildFailed(failure) => self.on_build_failed(failure),
            Event::SelectStep(index) => self.on_select_step(index),
            Event::ToggleFollow => {
                let on = self.tracker.toggle_follow();
                info!("follow mode {}", if on { "on" } else { "off" });
            }
            Event::ToggleVoice => {
                let on = self.tracker.toggle_voice();
                if !on {
                    self.voice.cancel();
                }
                info!("voice guidance {}", if on { "on" } else { "off" });
            }
            Event::Locate => {
                if let Some(fix) = self.last_fix {
                    self.map.fly_to(&fix, FOCUS_ZOOM);
                }
            }
        }
    }

    fn on_fix(&mut self, fix: Point) {
        let center = self.map.center();
        let outcome = self.tracker.handle_fix(&fix, center.as_ref());
        self.last_fix = Some(fix);
        self.apply(&fix, outcome);
    }

    /// Perform the collaborator side effects for one fix. Tracker
    /// state is already updated when this runs, so a failing
    /// collaborator cannot roll back the step pointer or the counter.
    fn apply(&mut self, fix: &Point, outcome: FixOutcome) {
        if let Some(index) = outcome.advanced_to {
            self.map.highlight_step(index);
            if let Some(text) = &outcome.announce {
                if self.tracker.voice() {
                    self.voice.announce(text);
                }
            }
        }

        if let Some(status) = &outcome.status {
            self.map.set_status(&status.text());
        }

        if outcome.reroute {
            self.request_reroute(fix);
        }

        if outcome.recenter {
            self.map.recenter(fix, FOLLOW_ZOOM);
        }
    }

    /// Rebuild from the triggering fix toward the stored destination.
    /// Single-flight: triggers while a build is pending are dropped.
    fn request_reroute(&mut self, fix: &Point) {
        if self.build_pending {
            debug!("reroute trigger dropped, build already in flight");
            return;
        }
        let Some(destination) = self.destination else {
            return;
        };

        self.build_pending = true;
        self.planner.begin_coords(*fix, destination);
        if self.tracker.voice() {
            self.voice.announce("Rerouting");
        }
        info!(
            "reroute requested from {:.6},{:.6}",
            fix.lat, fix.lon
        );
    }

    fn on_build(&mut self, from: &str, to: &str) {
        if self.build_pending {
            warn!("build request dropped, one already in flight");
            return;
        }
        self.build_pending = true;

        // Literal coordinate pairs skip the geocoder entirely
        match (parse_lat_lon(from), parse_lat_lon(to)) {
            (Some(a), Some(b)) => self.planner.begin_coords(a, b),
            _ => self.planner.begin_query(from, to),
        }
    }

    /// Install a freshly built route. The swap happens inside this one
    /// event, so fix handlers observe either the old route in full or
    /// the new one in full.
    fn on_route_ready(&mut self, route: Route) {
        self.build_pending = false;
        self.destination = Some(route.destination());

        let summary = *route.summary();
        self.tracker.install(route);

        self.map.highlight_step(0);
        self.map.set_status("Route ready");
        info!(
            "route ready: {}, {}",
            summary.distance_text(),
            summary.duration_text()
        );
    }

    fn on_build_failed(&mut self, failure: BuildFailure) {
        self.build_pending = false;
        warn!("route build failed: {failure}");
        // A stale route stays current; navigation continues on it
        self.map.set_status(&failure.to_string());
    }

    fn on_select_step(&mut self, index: usize) {
        let Some(step) = self.tracker.select_step(index) else {
            return;
        };
        let text = step.text.clone();
        let anchor = step.anchor;

        self.map.fly_to(&anchor, FOCUS_ZOOM);
        self.map.highlight_step(index);
        if self.tracker.voice() {
            self.voice.announce(&text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{RawInstruction, RouteSummary};
    use std::sync::mpsc;

    fn pt(lat: f64, lon: f64) -> Point {
        Point { lat, lon }
    }

    fn north_route() -> Route {
        Route::new(
            vec![pt(13.0, 80.0), pt(13.01, 80.0), pt(13.02, 80.0)],
            vec![
                RawInstruction { index: 0, text: "Head north".into() },
                RawInstruction { index: 1, text: "Turn right".into() },
                RawInstruction { index: 2, text: "Arrive".into() },
            ],
            RouteSummary {
                distance_m: 2_200.0,
                duration_s: 300.0,
            },
        )
        .unwrap()
    }

    #[derive(Default)]
    struct RecordingPlanner {
        query_calls: Vec<(String, String)>,
        coord_calls: Vec<(Point, Point)>,
    }

    impl RoutePlanner for RecordingPlanner {
        fn begin_query(&mut self, from: &str, to: &str) {
            self.query_calls.push((from.to_string(), to.to_string()));
        }
        fn begin_coords(&mut self, from: Point, to: Point) {
            self.coord_calls.push((from, to));
        }
    }

    #[derive(Default)]
    struct RecordingMap {
        center: Option<Point>,
        recenters: Vec<(Point, u8)>,
        fly_tos: Vec<(Point, u8)>,
        highlights: Vec<usize>,
        statuses: Vec<String>,
    }

    impl MapView for RecordingMap {
        fn center(&self) -> Option<Point> {
            self.center
        }
        fn recenter(&mut self, at: &Point, zoom_hint: u8) {
            self.recenters.push((*at, zoom_hint));
        }
        fn fly_to(&mut self, at: &Point, zoom_hint: u8) {
            self.fly_tos.push((*at, zoom_hint));
        }
        fn highlight_step(&mut self, index: usize) {
            self.highlights.push(index);
        }
        fn set_status(&mut self, status: &str) {
            self.statuses.push(status.to_string());
        }
    }

    #[derive(Default)]
    struct RecordingVoice {
        spoken: Vec<String>,
        cancels: u32,
    }

    impl VoiceAnnouncer for RecordingVoice {
        fn announce(&mut self, text: &str) {
            self.spoken.push(text.to_string());
        }
        fn cancel(&mut self) {
            self.cancels += 1;
        }
    }

    fn session() -> NavSession<RecordingPlanner, RecordingMap, RecordingVoice> {
        NavSession::new(
            RecordingPlanner::default(),
            RecordingMap::default(),
            RecordingVoice::default(),
        )
    }

    #[test]
    fn parse_lat_lon_accepts_literals() {
        let p = parse_lat_lon("13.0827,80.2707").unwrap();
        assert!((p.lat - 13.0827).abs() < 1e-9);
        assert!((p.lon - 80.2707).abs() < 1e-9);

        // Whitespace and negative values
        let p = parse_lat_lon(" -12.5 , -77.03 ").unwrap();
        assert!((p.lat + 12.5).abs() < 1e-9);
    }

    #[test]
    fn parse_lat_lon_rejects_junk() {
        assert!(parse_lat_lon("Chennai Central").is_none());
        assert!(parse_lat_lon("13.0").is_none());
        assert!(parse_lat_lon("95.0,80.0").is_none());
        assert!(parse_lat_lon("13.0,187.0").is_none());
        assert!(parse_lat_lon("").is_none());
    }

    #[test]
    fn build_with_literals_skips_geocoder() {
        let mut s = session();
        s.process(Event::BuildRoute {
            from: "13.0,80.0".into(),
            to: "13.02,80.0".into(),
        });

        assert!(s.planner.query_calls.is_empty());
        assert_eq!(s.planner.coord_calls.len(), 1);
    }

    #[test]
    fn build_with_queries_uses_geocoder() {
        let mut s = session();
        s.process(Event::BuildRoute {
            from: "Chennai Central".into(),
            to: "Chennai Airport".into(),
        });

        assert_eq!(s.planner.query_calls.len(), 1);
        assert!(s.planner.coord_calls.is_empty());
    }

    #[test]
    fn second_build_while_pending_is_dropped() {
        let mut s = session();
        s.process(Event::BuildRoute {
            from: "a".into(),
            to: "b".into(),
        });
        s.process(Event::BuildRoute {
            from: "c".into(),
            to: "d".into(),
        });

        assert_eq!(s.planner.query_calls.len(), 1);
    }

    #[test]
    fn route_ready_installs_and_reports() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));

        assert!(s.tracker().route().is_some());
        assert_eq!(s.tracker().step_index(), 0);
        assert_eq!(s.map.statuses.last().map(String::as_str), Some("Route ready"));
        assert_eq!(s.map.highlights.last(), Some(&0));
        // Destination remembered for reroutes
        assert!((s.destination.unwrap().lat - 13.02).abs() < 1e-9);
    }

    #[test]
    fn build_failed_keeps_stale_route() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));
        s.process(Event::BuildFailed(BuildFailure::RouteFailed {
            reason: "no path".into(),
        }));

        assert!(s.tracker().route().is_some(), "stale route must survive");
        assert!(!s.build_pending);
        assert!(s
            .map
            .statuses
            .last()
            .unwrap()
            .contains("Could not build route"));
    }

    #[test]
    fn geocode_failure_reports_query() {
        let mut s = session();
        s.process(Event::BuildFailed(BuildFailure::GeocodeNotFound {
            query: "nowhere, really".into(),
        }));

        assert!(s
            .map
            .statuses
            .last()
            .unwrap()
            .contains("nowhere, really"));
    }

    #[test]
    fn off_route_debounce_triggers_one_reroute() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));

        // Two consecutive fixes ~65 m east of the polyline
        s.process(Event::Fix(pt(13.005, 80.0006)));
        assert!(s.planner.coord_calls.is_empty(), "first off-route fix must not reroute");

        s.process(Event::Fix(pt(13.005, 80.0006)));
        assert_eq!(s.planner.coord_calls.len(), 1);

        // Toward the stored destination, from the triggering fix
        let (from, to) = s.planner.coord_calls[0];
        assert!((from.lat - 13.005).abs() < 1e-9);
        assert!((to.lat - 13.02).abs() < 1e-9);

        assert_eq!(s.voice.spoken.last().map(String::as_str), Some("Rerouting"));
    }

    #[test]
    fn reroute_triggers_while_pending_are_dropped() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));

        // Counter hits 2, 4, 6: three triggers, one in-flight build
        for _ in 0..6 {
            s.process(Event::Fix(pt(13.005, 80.0006)));
        }
        assert_eq!(s.planner.coord_calls.len(), 1, "single-flight guard");

        // Build completes; the next even count fires again
        s.process(Event::RouteReady(north_route()));
        s.process(Event::Fix(pt(13.005, 80.0006)));
        s.process(Event::Fix(pt(13.005, 80.0006)));
        assert_eq!(s.planner.coord_calls.len(), 2);
    }

    #[test]
    fn on_route_fix_updates_status() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));
        s.process(Event::Fix(pt(13.005, 80.0)));

        assert_eq!(s.map.statuses.last().map(String::as_str), Some("On route"));
    }

    #[test]
    fn step_advance_announces_and_highlights() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));
        s.process(Event::Fix(pt(13.0, 80.0)));

        assert_eq!(s.map.highlights.last(), Some(&1));
        assert_eq!(s.voice.spoken.last().map(String::as_str), Some("Turn right"));
    }

    #[test]
    fn voice_off_suppresses_announcements() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));
        s.process(Event::ToggleVoice);
        assert_eq!(s.voice.cancels, 1, "muting cancels the active utterance");

        s.process(Event::Fix(pt(13.0, 80.0)));
        assert!(s.voice.spoken.is_empty());
        // The step still advanced; only the announcement is suppressed
        assert_eq!(s.tracker().step_index(), 1);
    }

    #[test]
    fn follow_recenters_through_map_view() {
        let mut s = session();
        s.map.center = Some(pt(13.0, 80.0));

        s.process(Event::Fix(pt(13.005, 80.0)));
        assert_eq!(s.map.recenters.len(), 1);
        assert_eq!(s.map.recenters[0].1, FOLLOW_ZOOM);

        s.process(Event::ToggleFollow);
        s.process(Event::Fix(pt(13.01, 80.0)));
        assert_eq!(s.map.recenters.len(), 1, "no recenter while not following");
    }

    #[test]
    fn select_step_flies_and_announces() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));
        s.process(Event::SelectStep(2));

        assert_eq!(s.tracker().step_index(), 2);
        assert_eq!(s.map.fly_tos.len(), 1);
        assert_eq!(s.map.fly_tos[0].1, FOCUS_ZOOM);
        assert_eq!(s.voice.spoken.last().map(String::as_str), Some("Arrive"));
    }

    #[test]
    fn locate_flies_to_last_fix() {
        let mut s = session();
        s.process(Event::Locate);
        assert!(s.map.fly_tos.is_empty(), "no fix yet, nothing to fly to");

        s.process(Event::Fix(pt(13.001, 80.001)));
        s.process(Event::Locate);
        assert_eq!(s.map.fly_tos.len(), 1);
        assert!((s.map.fly_tos[0].0.lat - 13.001).abs() < 1e-9);
    }

    #[test]
    fn position_error_leaves_state_untouched() {
        let mut s = session();
        s.process(Event::RouteReady(north_route()));
        s.process(Event::Fix(pt(13.005, 80.0006)));
        let count_before = s.tracker().off_route_count();

        s.process(Event::PositionError("permission denied".into()));
        assert_eq!(s.tracker().off_route_count(), count_before);
        assert_eq!(s.tracker().step_index(), 0);
    }

    #[test]
    fn run_drains_channel_in_order() {
        let (tx, rx) = mpsc::channel();
        tx.send(Event::RouteReady(north_route())).unwrap();
        tx.send(Event::Fix(pt(13.0, 80.0))).unwrap();
        tx.send(Event::Fix(pt(13.005, 80.0006))).unwrap();
        drop(tx);

        let mut s = session();
        s.run(rx);

        assert_eq!(s.tracker().step_index(), 1);
        assert_eq!(s.tracker().off_route_count(), 1);
    }
}
