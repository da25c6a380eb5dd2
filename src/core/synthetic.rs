//! Synthetic biometric data.
//!
//! Used whenever there is no real record to score: before the first poll
//! completes, after a failed tick, and for explicit simulation requests.
//! Values follow a slow sine oscillation (period ~188 s) plus bounded jitter.

use crate::core::reading::{BiometricSample, Reading, ReadingSource};
use crate::core::scoring::heuristic_score;
use rand::Rng;

/// Seconds divisor for the oscillation.
const OSCILLATION_PERIOD_DIVISOR: f64 = 30.0;
const VARIATION_AMPLITUDE: f64 = 0.3;
const NOISE_AMPLITUDE: f64 = 0.2;

pub const HEART_RATE_RANGE: (f64, f64) = (50.0, 150.0);
pub const HRV_RANGE: (f64, f64) = (10.0, 100.0);
pub const EDA_RANGE: (f64, f64) = (0.05, 1.5);
pub const SKIN_TEMP_RANGE: (f64, f64) = (32.0, 37.0);

/// Generate a plausible sample for time `timestamp_millis`.
///
/// Deterministic for a fixed time and random source.
pub fn synthetic_sample<R: Rng>(timestamp_millis: i64, rng: &mut R) -> BiometricSample {
    let t = timestamp_millis as f64 / 1000.0;
    let variation = (t / OSCILLATION_PERIOD_DIVISOR).sin() * VARIATION_AMPLITUDE;
    let noise = (rng.gen::<f64>() - 0.5) * NOISE_AMPLITUDE;

    let hr = (75.0 + variation * 20.0 + noise * 15.0).trunc();
    let hrv = (45.0 + variation * 15.0 + noise * 10.0).trunc();
    let eda = round_to(0.3 + variation.abs() * 0.4 + noise.abs() * 0.3, 2);
    let temp = round_to(34.5 + variation * 1.5 + noise * 0.5, 1);

    BiometricSample::new(
        clamp_range(eda, EDA_RANGE),
        clamp_range(hr, HEART_RATE_RANGE),
        clamp_range(hrv, HRV_RANGE),
        clamp_range(temp, SKIN_TEMP_RANGE),
    )
}

/// Generate a heuristic-scored reading tagged [`ReadingSource::Simulated`].
pub fn synthetic_reading<R: Rng>(timestamp_millis: i64, rng: &mut R) -> Reading {
    let sample = synthetic_sample(timestamp_millis, rng);
    Reading::from_sample(
        &sample,
        heuristic_score(&sample),
        timestamp_millis,
        ReadingSource::Simulated,
    )
}

fn clamp_range(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
