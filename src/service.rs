//! The stress service: owns the poller and answers queries.
//!
//! ```text
//!  recorder ──append──▶ CSV source ◀──poll── SourceReader ──publish──▶ ReadingStore
//!                            ▲                                             │
//!                  inject ───┘                          current_reading ◀──┘
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::core::{synthetic_reading, ModelProbe, Reading, ScoreCalculator};
use crate::error::StressError;
use crate::source::{ReaderState, RecordSource, SourceReader, TickOutcome};
use crate::store::{ReadingStore, SharedReadingStore};
use crate::telemetry::{ServiceStats, SharedServiceStats, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Service status, as reported on `/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Both model artifacts are present
    pub model_available: bool,
    /// The model is loaded and used for scoring
    pub model_loaded: bool,
    /// The record source exists
    pub source_exists: bool,
    /// Timestamp of the latest published reading
    pub last_update: Option<i64>,
}

struct Poller {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Facade over the scoring engine.
pub struct StressService {
    source: Arc<RecordSource>,
    store: SharedReadingStore,
    stats: SharedServiceStats,
    clock: Arc<dyn Clock>,
    reader: Arc<SourceReader>,
    model_available: bool,
    model_loaded: bool,
    poll_interval: Duration,
    error_backoff: Duration,
    poller: Mutex<Option<Poller>>,
}

impl StressService {
    /// Build the service from configuration, probing for model artifacts once.
    pub fn new(config: &Config, stats: SharedServiceStats) -> Self {
        let probe = ModelProbe::new(&config.model_path, &config.scaler_path);
        let calculator = match probe.load() {
            Some(artifact) => ScoreCalculator::with_model(Arc::new(artifact)),
            None => ScoreCalculator::heuristic(),
        };

        Self::with_parts(config, calculator, probe.available, Arc::new(SystemClock), stats)
    }

    /// Build the service from explicit parts.
    pub fn with_parts(
        config: &Config,
        calculator: ScoreCalculator,
        model_available: bool,
        clock: Arc<dyn Clock>,
        stats: SharedServiceStats,
    ) -> Self {
        let source = Arc::new(RecordSource::new(&config.source_path));
        let store = Arc::new(ReadingStore::new());
        let model_loaded = calculator.has_model();
        let reader = Arc::new(SourceReader::new(
            source.clone(),
            calculator,
            store.clone(),
            stats.clone(),
            clock.clone(),
        ));

        Self {
            source,
            store,
            stats,
            clock,
            reader,
            model_available,
            model_loaded,
            poll_interval: config.poll_interval,
            error_backoff: config.error_backoff(),
            poller: Mutex::new(None),
        }
    }

    /// Start the background poller. Must be called inside a tokio runtime.
    ///
    /// Calling this while the poller is already running does nothing.
    pub fn start(&self) {
        let mut poller = self.poller.lock().unwrap_or_else(|e| e.into_inner());
        if poller.is_some() {
            return;
        }

        let (shutdown, rx) = watch::channel(false);
        let task = tokio::spawn(
            self.reader
                .clone()
                .run(self.poll_interval, self.error_backoff, rx),
        );
        *poller = Some(Poller { shutdown, task });
    }

    /// Stop the poller and wait for it to finish its current tick.
    pub async fn shutdown(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(Poller { shutdown, task }) = poller {
            let _ = shutdown.send(true);
            if let Err(e) = task.await {
                tracing::error!("Poller task failed: {}", e);
            }
        }
    }

    /// Run a single poll cycle on the calling thread.
    pub fn poll_now(&self) -> TickOutcome {
        self.reader.tick()
    }

    /// The latest published reading, or a fresh synthetic one if nothing has
    /// been published yet. The synthetic reading is not stored.
    pub fn current_reading(&self) -> Reading {
        match self.store.latest() {
            Some(reading) => reading,
            None => {
                tracing::debug!("{}, serving synthetic reading", StressError::StoreEmpty);
                synthetic_reading(self.clock.now_millis(), &mut rand::thread_rng())
            }
        }
    }

    /// Current time on the service clock.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn status(&self) -> ServiceStatus {
        ServiceStatus {
            model_available: self.model_available,
            model_loaded: self.model_loaded,
            source_exists: self.source.exists(),
            last_update: self.store.last_update(),
        }
    }

    /// Generate a synthetic reading and append its raw fields to the source so
    /// the next poll scores it like any other record. Blocks on file I/O.
    pub fn inject_simulated_reading(&self) -> Result<Reading, StressError> {
        let reading = synthetic_reading(self.clock.now_millis(), &mut rand::thread_rng());

        match self.source.append(&reading.sample()) {
            Ok(()) => {
                self.stats.record_injection();
                tracing::info!(
                    hr = reading.heart_rate(),
                    hrv = reading.heart_rate_variability(),
                    eda = reading.eda(),
                    temp = reading.skin_temp(),
                    "Appended simulated record"
                );
                Ok(reading)
            }
            Err(e) => {
                self.stats.record_injection_failure();
                tracing::error!("Failed to append simulated record: {}", e);
                Err(e)
            }
        }
    }

    pub fn reader_state(&self) -> ReaderState {
        self.reader.state()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn source_path(&self) -> &Path {
        self.source.path()
    }
}

/// Thread-safe shared service.
pub type SharedStressService = Arc<StressService>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::core::ReadingSource;

    fn test_config(name: &str) -> Config {
        let dir = std::env::temp_dir().join(format!(
            "stress-agent-service-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        Config {
            source_path: dir.join("live.csv"),
            model_path: dir.join("stress_model.json"),
            scaler_path: dir.join("scaler.json"),
            poll_interval: Duration::from_millis(10),
            data_path: dir,
            ..Config::default()
        }
    }

    fn service(name: &str) -> StressService {
        StressService::with_parts(
            &test_config(name),
            ScoreCalculator::heuristic(),
            false,
            Arc::new(ManualClock::new(5_000)),
            Arc::new(ServiceStats::new()),
        )
    }

    #[test]
    fn test_empty_store_serves_unstored_synthetic_reading() {
        let service = service("empty");
        let reading = service.current_reading();
        assert_eq!(reading.source(), ReadingSource::Simulated);
        assert_eq!(reading.timestamp_millis(), 5_000);
        assert_eq!(service.status().last_update, None);
        assert_eq!(service.now_millis(), 5_000);
    }

    #[test]
    fn test_status_without_model() {
        let service = service("status");
        let status = service.status();
        assert!(!status.model_available);
        assert!(!status.model_loaded);
        assert!(!status.source_exists);

        service.poll_now();
        service.poll_now();
        let status = service.status();
        assert!(status.source_exists);
        assert_eq!(status.last_update, Some(5_000));
    }

    #[test]
    fn test_inject_then_poll_scores_injected_row() {
        let service = service("inject");
        service.poll_now();

        let injected = service.inject_simulated_reading().unwrap();
        assert_eq!(injected.source(), ReadingSource::Simulated);

        service.poll_now();
        let current = service.current_reading();
        assert_eq!(current.source(), ReadingSource::Heuristic);
        assert_eq!(current.heart_rate(), injected.heart_rate());
        assert_eq!(current.heart_rate_variability(), injected.heart_rate_variability());
        assert_eq!(service.stats().injections, 1);
    }

    #[test]
    fn test_inject_failure_is_reported() {
        let config = test_config("inject-fail");
        // Parent "directory" is a regular file, so the append cannot succeed
        std::fs::create_dir_all(config.data_path.parent().unwrap()).unwrap();
        std::fs::write(&config.data_path, "not a directory").unwrap();

        let service = StressService::with_parts(
            &config,
            ScoreCalculator::heuristic(),
            false,
            Arc::new(ManualClock::new(0)),
            Arc::new(ServiceStats::new()),
        );

        let err = service.inject_simulated_reading().unwrap_err();
        assert!(matches!(err, StressError::Append { .. }));
        assert_eq!(service.stats().injection_failures, 1);

        let _ = std::fs::remove_file(&config.data_path);
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let service = service("lifecycle");
        assert_eq!(service.reader_state(), ReaderState::Idle);

        service.start();
        service.start();

        for _ in 0..100 {
            if service.status().last_update.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(service.status().last_update.is_some());

        service.shutdown().await;
        assert_eq!(service.reader_state(), ReaderState::Stopped);
    }
}
