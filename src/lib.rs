//! Stress Agent - local stress-score service for EmotiBit biometric feeds.
//!
//! An external recorder appends EDA, heart rate, HRV and skin temperature rows
//! to a CSV file. This crate polls that file, scores the latest row on a 0-10
//! stress scale, and serves the result. It never fails to answer: when there
//! is no usable data it falls back to synthetic readings.
//!
//! # Scoring tiers
//!
//! - **Model**: a trained dense regression network with a feature scaler,
//!   used when both artifacts are present
//! - **Heuristic**: weighted heart-rate / HRV / EDA sub-scores, used when
//!   there is no model and whenever a model call fails
//! - **Simulated**: synthetic readings when there is no record to score
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Stress Agent                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │ CSV Source  │──▶│SourceReader │──▶│ReadingStore │       │
//! │  │ (append-only│   │ (1s ticks)  │   │  (latest)   │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         ▲                 │                  │              │
//! │         │                 ▼                  ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │  /simulate  │   │   Scoring   │   │  /reading   │       │
//! │  │  (inject)   │   │model|heur.  │   │  /status    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stress_agent::{Config, ServiceStats, StressService};
//!
//! let config = Config::default();
//! let service = StressService::new(&config, Arc::new(ServiceStats::new()));
//!
//! // One synchronous poll: seeds the source if it is missing
//! service.poll_now();
//!
//! let reading = service.current_reading();
//! println!("stress {:.1} ({})", reading.score(), reading.source());
//! ```

pub mod api;
pub mod clock;
pub mod config;
pub mod core;
pub mod error;
pub mod service;
pub mod source;
pub mod store;
pub mod telemetry;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use api::ReadingResponse;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use core::{
    heuristic_score, BiometricSample, ModelArtifact, Reading, ReadingSource, ScoreCalculator,
    StressModel,
};
pub use error::{ConfigError, ModelError, StressError};
pub use service::{ServiceStatus, SharedStressService, StressService};
pub use source::{ReaderState, RecordSource, SourceReader, TickOutcome};
pub use store::ReadingStore;
pub use telemetry::{ServiceStats, StatsSnapshot};

// Server re-exports (when enabled)
#[cfg(feature = "server")]
pub use server::{ServerConfig, ServerHandle};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Notice shown by the CLI; the score is not a medical measurement.
pub const SCORE_NOTICE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                 STRESS AGENT - ABOUT THE SCORE                   ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  The stress score (0-10) is an estimate derived from EDA,        ║
║  heart rate, heart rate variability and skin temperature.        ║
║                                                                  ║
║  It is NOT a medical measurement or diagnosis.                   ║
║                                                                  ║
║  Readings tagged "simulated" are synthetic and contain no        ║
║  data from any wearer.                                           ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_notice_contents() {
        assert!(SCORE_NOTICE.contains("NOT a medical measurement"));
        assert!(SCORE_NOTICE.contains("simulated"));
    }
}
