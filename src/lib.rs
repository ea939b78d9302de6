pub mod android_jni;
pub mod geo;
pub mod gpx;
pub mod instructions;
pub mod route;
pub mod session;
pub mod simplify;
pub mod tracking;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
