//! Service telemetry.
//!
//! Counters describing what the agent has done, exposed over `/stats` and
//! printed when the service shuts down.

pub mod stats;

pub use stats::{ServiceStats, SharedServiceStats, StatsSnapshot};
