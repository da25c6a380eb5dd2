//! Background poller for the record source.
//!
//! Each tick seeds the source if it is missing, otherwise scores the latest
//! record and publishes it. A tick that fails publishes a synthetic reading
//! instead, and the next tick waits for the error backoff rather than the
//! normal interval. The loop only ends on shutdown.

use crate::clock::Clock;
use crate::core::{synthetic_reading, Reading, ScoreCalculator};
use crate::error::StressError;
use crate::source::records::{RecordSource, SeedOutcome};
use crate::store::SharedReadingStore;
use crate::telemetry::SharedServiceStats;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Lifecycle of the poller: `Idle -> Polling -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaderState {
    Idle,
    Polling,
    Stopped,
}

impl ReaderState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ReaderState::Polling,
            2 => ReaderState::Stopped,
            _ => ReaderState::Idle,
        }
    }
}

/// What a single tick did.
#[derive(Debug)]
pub enum TickOutcome {
    /// The latest record was scored and published
    Published(Reading),
    /// The source was missing and has been seeded; nothing was scored
    Seeded,
    /// The tick failed; a synthetic reading was published instead
    Recovered { reading: Reading, error: StressError },
}

/// Polls a [`RecordSource`] and publishes readings into the store.
pub struct SourceReader {
    source: Arc<RecordSource>,
    calculator: ScoreCalculator,
    store: SharedReadingStore,
    stats: SharedServiceStats,
    clock: Arc<dyn Clock>,
    /// Last published timestamp, keeps published readings ordered
    last_timestamp: AtomicI64,
    state: AtomicU8,
}

impl SourceReader {
    pub fn new(
        source: Arc<RecordSource>,
        calculator: ScoreCalculator,
        store: SharedReadingStore,
        stats: SharedServiceStats,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            calculator,
            store,
            stats,
            clock,
            last_timestamp: AtomicI64::new(i64::MIN),
            state: AtomicU8::new(ReaderState::Idle as u8),
        }
    }

    pub fn state(&self) -> ReaderState {
        ReaderState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ReaderState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Run one poll cycle. Blocks on file I/O.
    pub fn tick(&self) -> TickOutcome {
        self.stats.record_tick();

        match self.try_tick() {
            Ok(Some(reading)) => {
                self.store.publish(reading);
                self.stats.record_published();
                tracing::debug!(
                    score = reading.score(),
                    source = %reading.source(),
                    "Published reading"
                );
                TickOutcome::Published(reading)
            }
            Ok(None) => TickOutcome::Seeded,
            Err(error) => {
                tracing::warn!("Poll tick failed, publishing synthetic reading: {}", error);
                let reading = synthetic_reading(self.next_timestamp(), &mut rand::thread_rng());
                self.store.publish(reading);
                self.stats.record_recovered();
                TickOutcome::Recovered { reading, error }
            }
        }
    }

    fn try_tick(&self) -> Result<Option<Reading>, StressError> {
        if self.source.ensure_exists()? == SeedOutcome::Seeded {
            self.stats.record_seeded();
            return Ok(None);
        }

        let latest = self.source.read_latest()?;
        if !latest.defaulted.is_empty() {
            for error in &latest.defaulted {
                tracing::debug!("Using default: {}", error);
            }
            self.stats
                .record_fields_defaulted(latest.defaulted.len() as u64);
        }

        let scored = self.calculator.score(&latest.sample);
        if scored.model_failed {
            self.stats.record_model_fallback();
        }

        Ok(Some(Reading::from_sample(
            &latest.sample,
            scored.score,
            self.next_timestamp(),
            scored.source,
        )))
    }

    /// Current time, never earlier than the previously published timestamp.
    fn next_timestamp(&self) -> i64 {
        let now = self.clock.now_millis();
        let previous = self.last_timestamp.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Ticks run on the blocking pool so file I/O never stalls the runtime.
    pub async fn run(
        self: Arc<Self>,
        interval: Duration,
        error_backoff: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        self.set_state(ReaderState::Polling);
        tracing::info!(
            path = ?self.source.path(),
            interval_ms = interval.as_millis() as u64,
            "Started monitoring record source"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let reader = self.clone();
            let delay = match tokio::task::spawn_blocking(move || reader.tick()).await {
                Ok(TickOutcome::Recovered { .. }) => error_backoff,
                Ok(_) => interval,
                Err(e) => {
                    tracing::error!("Poll tick aborted: {}", e);
                    error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_state(ReaderState::Stopped);
        tracing::info!("Stopped monitoring record source");
    }
}
