//! Service counters.
//!
//! Tracks what the agent has done (ticks, publishes, recoveries, model
//! fallbacks, injections) with lock-free counters that request handlers and
//! the background reader can bump concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the current process.
#[derive(Debug)]
pub struct ServiceStats {
    /// Poll ticks executed
    ticks: AtomicU64,
    /// Readings scored from real records and published
    readings_published: AtomicU64,
    /// Times the record source was (re)created with seed rows
    sources_seeded: AtomicU64,
    /// Failed ticks recovered by publishing a synthetic reading
    ticks_recovered: AtomicU64,
    /// Model calls that fell back to the heuristic
    model_fallbacks: AtomicU64,
    /// Record fields replaced by their defaults
    fields_defaulted: AtomicU64,
    /// Simulated records appended on request
    injections: AtomicU64,
    /// Simulated records that could not be appended
    injection_failures: AtomicU64,
    /// Service start time
    started_at: DateTime<Utc>,
    /// Path for persisting counters
    persist_path: Option<PathBuf>,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            readings_published: AtomicU64::new(0),
            sources_seeded: AtomicU64::new(0),
            ticks_recovered: AtomicU64::new(0),
            model_fallbacks: AtomicU64::new(0),
            fields_defaulted: AtomicU64::new(0),
            injections: AtomicU64::new(0),
            injection_failures: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create counters that accumulate across runs in a JSON file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous service stats: {}", e);
        }

        stats
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.readings_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_seeded(&self) {
        self.sources_seeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recovered(&self) {
        self.ticks_recovered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_fallback(&self) {
        self.model_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fields_defaulted(&self, count: u64) {
        self.fields_defaulted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_injection(&self) {
        self.injections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_injection_failure(&self) {
        self.injection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            readings_published: self.readings_published.load(Ordering::Relaxed),
            sources_seeded: self.sources_seeded.load(Ordering::Relaxed),
            ticks_recovered: self.ticks_recovered.load(Ordering::Relaxed),
            model_fallbacks: self.model_fallbacks.load(Ordering::Relaxed),
            fields_defaulted: self.fields_defaulted.load(Ordering::Relaxed),
            injections: self.injections.load(Ordering::Relaxed),
            injection_failures: self.injection_failures.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Summary string for display at shutdown.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Service Statistics:\n\
             - Poll ticks: {}\n\
             - Readings published: {}\n\
             - Source seeded: {} time(s)\n\
             - Ticks recovered with synthetic data: {}\n\
             - Model fallbacks to heuristic: {}\n\
             - Fields defaulted: {}\n\
             - Simulated records injected: {} ({} failed)\n\
             - Uptime: {} seconds",
            stats.ticks,
            stats.readings_published,
            stats.sources_seeded,
            stats.ticks_recovered,
            stats.model_fallbacks,
            stats.fields_defaulted,
            stats.injections,
            stats.injection_failures,
            stats.uptime_secs
        )
    }

    /// Save counters to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                ticks: stats.ticks,
                readings_published: stats.readings_published,
                sources_seeded: stats.sources_seeded,
                ticks_recovered: stats.ticks_recovered,
                model_fallbacks: stats.model_fallbacks,
                fields_defaulted: stats.fields_defaulted,
                injections: stats.injections,
                injection_failures: stats.injection_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.ticks.store(persisted.ticks, Ordering::Relaxed);
                self.readings_published
                    .store(persisted.readings_published, Ordering::Relaxed);
                self.sources_seeded
                    .store(persisted.sources_seeded, Ordering::Relaxed);
                self.ticks_recovered
                    .store(persisted.ticks_recovered, Ordering::Relaxed);
                self.model_fallbacks
                    .store(persisted.model_fallbacks, Ordering::Relaxed);
                self.fields_defaulted
                    .store(persisted.fields_defaulted, Ordering::Relaxed);
                self.injections.store(persisted.injections, Ordering::Relaxed);
                self.injection_failures
                    .store(persisted.injection_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub ticks: u64,
    pub readings_published: u64,
    pub sources_seeded: u64,
    pub ticks_recovered: u64,
    pub model_fallbacks: u64,
    pub fields_defaulted: u64,
    pub injections: u64,
    pub injection_failures: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    ticks: u64,
    readings_published: u64,
    sources_seeded: u64,
    ticks_recovered: u64,
    model_fallbacks: u64,
    #[serde(default)]
    fields_defaulted: u64,
    injections: u64,
    #[serde(default)]
    injection_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared counters.
pub type SharedServiceStats = Arc<ServiceStats>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = ServiceStats::new();
        stats.record_tick();
        stats.record_tick();
        stats.record_published();
        stats.record_fields_defaulted(3);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.readings_published, 1);
        assert_eq!(snapshot.fields_defaulted, 3);
        assert_eq!(snapshot.injections, 0);
    }

    #[test]
    fn test_summary_format() {
        let stats = ServiceStats::new();
        let summary = stats.summary();
        assert!(summary.contains("Poll ticks"));
        assert!(summary.contains("Model fallbacks"));
        assert!(summary.contains("Uptime"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("stress-agent-stats-{}", std::process::id()))
            .join("stats.json");
        let _ = std::fs::remove_file(&path);

        let stats = ServiceStats::with_persistence(path.clone());
        stats.record_tick();
        stats.record_published();
        stats.record_seeded();
        stats.record_recovered();
        stats.record_model_fallback();
        stats.record_fields_defaulted(2);
        stats.record_injection();
        stats.record_injection_failure();
        stats.save().unwrap();

        let reloaded = ServiceStats::with_persistence(path.clone());
        let snapshot = reloaded.snapshot();
        assert_eq!(snapshot.ticks, 1);
        assert_eq!(snapshot.readings_published, 1);
        assert_eq!(snapshot.sources_seeded, 1);
        assert_eq!(snapshot.ticks_recovered, 1);
        assert_eq!(snapshot.model_fallbacks, 1);
        assert_eq!(snapshot.fields_defaulted, 2);
        assert_eq!(snapshot.injections, 1);
        assert_eq!(snapshot.injection_failures, 1);

        let _ = std::fs::remove_file(&path);
    }
}
