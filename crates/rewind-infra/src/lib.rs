//! Rewind infrastructure
//!
//! Tracing subscriber setup shared by the rewind binaries.

pub mod telemetry;

pub use telemetry::init_telemetry;
