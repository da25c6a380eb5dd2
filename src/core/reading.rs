//! Reading and sample types.
//!
//! A [`Reading`] is an immutable snapshot: biometric inputs, the derived
//! stress score and a provenance tag saying which path produced it.

use serde::{Deserialize, Serialize};

/// Lowest possible stress score.
pub const SCORE_MIN: f64 = 0.0;
/// Highest possible stress score.
pub const SCORE_MAX: f64 = 10.0;
/// Score used when a strategy hands back something that is not a number.
pub const NEUTRAL_SCORE: f64 = 5.0;

/// Which strategy or path produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    /// Scored by the trained model
    Model,
    /// Scored by the weighted heuristic
    Heuristic,
    /// Generated by the synthetic generator
    Simulated,
    /// Safe default returned when a reading could not be produced
    ErrorFallback,
}

impl ReadingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingSource::Model => "model",
            ReadingSource::Heuristic => "heuristic",
            ReadingSource::Simulated => "simulated",
            ReadingSource::ErrorFallback => "error_fallback",
        }
    }
}

impl std::fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw biometric inputs, as they appear in one source record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Electrodermal activity (μS)
    pub eda: f64,
    /// Heart rate (bpm)
    pub heart_rate: f64,
    /// Heart rate variability (ms)
    pub heart_rate_variability: f64,
    /// Skin temperature (°C)
    pub skin_temp: f64,
}

impl BiometricSample {
    pub const DEFAULT_EDA: f64 = 0.3;
    pub const DEFAULT_HEART_RATE: f64 = 75.0;
    pub const DEFAULT_HRV: f64 = 45.0;
    pub const DEFAULT_SKIN_TEMP: f64 = 34.5;

    pub fn new(eda: f64, heart_rate: f64, heart_rate_variability: f64, skin_temp: f64) -> Self {
        Self {
            eda,
            heart_rate,
            heart_rate_variability,
            skin_temp,
        }
    }

    /// Feature vector in model order: `[eda, hr, hrv, temp]`.
    pub fn features(&self) -> [f64; 4] {
        [
            self.eda,
            self.heart_rate,
            self.heart_rate_variability,
            self.skin_temp,
        ]
    }
}

impl Default for BiometricSample {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_EDA,
            Self::DEFAULT_HEART_RATE,
            Self::DEFAULT_HRV,
            Self::DEFAULT_SKIN_TEMP,
        )
    }
}

/// One immutable snapshot of biometric inputs plus derived score and provenance.
///
/// Fields are private so the score invariant (always within `[0, 10]`) cannot be
/// broken after construction. Updates replace the whole value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    eda: f64,
    heart_rate: i32,
    heart_rate_variability: i32,
    skin_temp: f64,
    score: f64,
    timestamp_millis: i64,
    source: ReadingSource,
}

impl Reading {
    /// Build a reading from a sample. Heart rate and HRV are truncated toward zero.
    pub fn from_sample(
        sample: &BiometricSample,
        score: f64,
        timestamp_millis: i64,
        source: ReadingSource,
    ) -> Self {
        Self {
            eda: sample.eda,
            heart_rate: sample.heart_rate as i32,
            heart_rate_variability: sample.heart_rate_variability as i32,
            skin_temp: sample.skin_temp,
            score: clamp_score(score),
            timestamp_millis,
            source,
        }
    }

    /// The safe default served when nothing better can be produced.
    pub fn error_fallback(timestamp_millis: i64) -> Self {
        Self::from_sample(
            &BiometricSample::default(),
            NEUTRAL_SCORE,
            timestamp_millis,
            ReadingSource::ErrorFallback,
        )
    }

    pub fn eda(&self) -> f64 {
        self.eda
    }

    pub fn heart_rate(&self) -> i32 {
        self.heart_rate
    }

    pub fn heart_rate_variability(&self) -> i32 {
        self.heart_rate_variability
    }

    pub fn skin_temp(&self) -> f64 {
        self.skin_temp
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn source(&self) -> ReadingSource {
        self.source
    }

    /// The raw biometric fields of this reading, as they would be appended to the source.
    pub fn sample(&self) -> BiometricSample {
        BiometricSample::new(
            self.eda,
            self.heart_rate as f64,
            self.heart_rate_variability as f64,
            self.skin_temp,
        )
    }
}

/// Clamp a score into `[0, 10]`, mapping NaN to the neutral score.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        NEUTRAL_SCORE
    } else {
        score.clamp(SCORE_MIN, SCORE_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped_on_construction() {
        let sample = BiometricSample::default();
        let high = Reading::from_sample(&sample, 42.0, 0, ReadingSource::Model);
        assert_eq!(high.score(), SCORE_MAX);

        let low = Reading::from_sample(&sample, -3.0, 0, ReadingSource::Model);
        assert_eq!(low.score(), SCORE_MIN);

        let nan = Reading::from_sample(&sample, f64::NAN, 0, ReadingSource::Model);
        assert_eq!(nan.score(), NEUTRAL_SCORE);

        let inf = Reading::from_sample(&sample, f64::INFINITY, 0, ReadingSource::Model);
        assert_eq!(inf.score(), SCORE_MAX);
    }

    #[test]
    fn test_heart_rate_is_truncated() {
        let sample = BiometricSample::new(0.3, 75.9, 44.6, 34.5);
        let reading = Reading::from_sample(&sample, 3.0, 1, ReadingSource::Heuristic);
        assert_eq!(reading.heart_rate(), 75);
        assert_eq!(reading.heart_rate_variability(), 44);
    }

    #[test]
    fn test_error_fallback_defaults() {
        let reading = Reading::error_fallback(123);
        assert_eq!(reading.heart_rate(), 75);
        assert_eq!(reading.heart_rate_variability(), 45);
        assert_eq!(reading.eda(), 0.3);
        assert_eq!(reading.skin_temp(), 34.5);
        assert_eq!(reading.score(), 5.0);
        assert_eq!(reading.source(), ReadingSource::ErrorFallback);
    }

    #[test]
    fn test_source_serializes_snake_case() {
        let json = serde_json::to_string(&ReadingSource::ErrorFallback).unwrap();
        assert_eq!(json, "\"error_fallback\"");
        assert_eq!(ReadingSource::Model.to_string(), "model");
    }
}
