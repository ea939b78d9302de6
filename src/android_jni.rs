//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun`
//! declaration in RustBridge.kt. The function names follow JNI naming
//! conventions: Java_<package>_<class>_<method> with dots replaced by
//! underscores.
//!
//! The tracker is stateful; the host holds it as an opaque handle and
//! must call `trackerFree` exactly once. Decisions come back as JSON
//! (`FixOutcome`, snapshots) and the host performs the side effects:
//! announce, highlight, recenter, rebuild.

use jni::objects::{JByteArray, JClass, JString};
use jni::sys::{jboolean, jdouble, jint, jlong, jstring};
use jni::JNIEnv;

use crate::geo::Point;
use crate::gpx;
use crate::route::{Route, RoutePayload};
use crate::tracking::Tracker;

fn to_jstring(env: &JNIEnv, s: &str) -> jstring {
    env.new_string(s)
        .expect("failed to create Java string")
        .into_raw()
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

fn tracker_mut<'a>(handle: jlong) -> Option<&'a mut Tracker> {
    if handle == 0 {
        return None;
    }
    Some(unsafe { &mut *(handle as *mut Tracker) })
}

/// Returns the nav-core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    let version = crate::VERSION;
    to_jstring(&env, version)
}

/// Routes log output to logcat. Call once at app start.
/// Maps to: RustBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Info)
            .with_tag("ndnav"),
    );
}

/// Creates a tracker and returns its handle.
/// Maps to: RustBridge.trackerNew() -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerNew(
    _env: JNIEnv,
    _class: JClass,
) -> jlong {
    Box::into_raw(Box::new(Tracker::new())) as jlong
}

/// Releases a tracker handle.
/// Maps to: RustBridge.trackerFree(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerFree(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        drop(unsafe { Box::from_raw(handle as *mut Tracker) });
    }
}

/// Installs a route from its JSON wire form
/// (`{points, instructions, summary}`) and returns the new snapshot,
/// or `{"error": ...}` when the payload is rejected.
/// Maps to: RustBridge.trackerInstallRoute(handle: Long, json: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerInstallRoute(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    route_json: JString,
) -> jstring {
    let json: String = match env.get_string(&route_json) {
        Ok(s) => s.into(),
        Err(e) => return to_jstring(&env, &error_json(&format!("bad string: {e}"))),
    };

    let result = serde_json::from_str::<RoutePayload>(&json)
        .map_err(|e| format!("route payload error: {e}"))
        .and_then(Route::from_payload);

    let body = match (tracker_mut(handle), result) {
        (Some(tracker), Ok(route)) => {
            tracker.install(route);
            serde_json::to_string(&tracker.snapshot())
                .expect("snapshot serializes")
        }
        (None, _) => error_json("null tracker handle"),
        (_, Err(e)) => error_json(&e),
    };
    to_jstring(&env, &body)
}

/// Feeds one position fix and returns the `FixOutcome` JSON the host
/// should act on. `has_center` tells whether the center pair is valid.
/// Maps to: RustBridge.trackerOnFix(handle, lat, lon, hasCenter, centerLat, centerLon) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerOnFix(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lon: jdouble,
    has_center: jboolean,
    center_lat: jdouble,
    center_lon: jdouble,
) -> jstring {
    let Some(tracker) = tracker_mut(handle) else {
        return to_jstring(&env, &error_json("null tracker handle"));
    };

    let fix = Point { lat, lon };
    let center = (has_center != 0).then_some(Point {
        lat: center_lat,
        lon: center_lon,
    });

    let outcome = tracker.handle_fix(&fix, center.as_ref());
    let body = serde_json::to_string(&outcome).expect("outcome serializes");
    to_jstring(&env, &body)
}

/// Makes a tapped step current and returns it as JSON, or
/// `{"error": ...}` when the index is unknown.
/// Maps to: RustBridge.trackerSelectStep(handle: Long, index: Int) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerSelectStep(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    index: jint,
) -> jstring {
    let Some(tracker) = tracker_mut(handle) else {
        return to_jstring(&env, &error_json("null tracker handle"));
    };
    if index < 0 {
        return to_jstring(&env, &error_json("negative step index"));
    }

    let body = match tracker.select_step(index as usize) {
        Some(step) => serde_json::to_string(step).expect("step serializes"),
        None => error_json("no such step"),
    };
    to_jstring(&env, &body)
}

/// Maps to: RustBridge.trackerToggleFollow(handle: Long) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerToggleFollow(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    match tracker_mut(handle) {
        Some(tracker) => tracker.toggle_follow() as jboolean,
        None => 0,
    }
}

/// Maps to: RustBridge.trackerToggleVoice(handle: Long) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerToggleVoice(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    match tracker_mut(handle) {
        Some(tracker) => tracker.toggle_voice() as jboolean,
        None => 0,
    }
}

/// Returns the tracker state as JSON for the UI.
/// Maps to: RustBridge.trackerSnapshot(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_trackerSnapshot(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let body = match tracker_mut(handle) {
        Some(tracker) => {
            serde_json::to_string(&tracker.snapshot()).expect("snapshot serializes")
        }
        None => error_json("null tracker handle"),
    };
    to_jstring(&env, &body)
}

/// Parses GPX bytes and returns every contained geometry as a
/// navigable route, JSON-encoded: `{"routes": [...]}`. Tracks are
/// reduced to maneuver points first.
/// Maps to: RustBridge.gpxToRoutes(data: ByteArray) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndnav_app_RustBridge_gpxToRoutes(
    mut env: JNIEnv,
    _class: JClass,
    data: JByteArray,
) -> jstring {
    let bytes = match env.convert_byte_array(&data) {
        Ok(b) => b,
        Err(e) => return to_jstring(&env, &error_json(&format!("bad byte array: {e}"))),
    };

    let body = match gpx_routes_json(&bytes) {
        Ok(json) => json,
        Err(e) => error_json(&e),
    };
    to_jstring(&env, &body)
}

fn gpx_routes_json(bytes: &[u8]) -> Result<String, String> {
    let import = gpx::parse_bytes(bytes)?;

    let mut routes: Vec<Route> = Vec::new();
    for path in &import.routes {
        routes.push(gpx::route_from_planned(path)?);
    }
    for path in &import.tracks {
        routes.push(gpx::route_from_track(path, gpx::DEFAULT_TRACK_TOLERANCE_M)?);
    }

    serde_json::to_string(&serde_json::json!({ "routes": routes }))
        .map_err(|e| format!("JSON serialize error: {e}"))
}
